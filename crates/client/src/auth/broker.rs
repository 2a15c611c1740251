// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token broker: single-flight reissue coordination, proactive scheduling,
//! and session event fan-out.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::auth::reissue::reissue;
use crate::auth::scheduler::{fire_delay, ExpiryTimer};
use crate::auth::store::{SecretStore, ACCESS_KEY, ISSUED_AT_KEY, REFRESH_KEY};
use crate::auth::{now_ms, RefreshReason, SessionEvent, TokenState};
use crate::config::ClientConfig;
use crate::error::RefreshError;

/// One refresh round's outcome, fanned out to every waiter.
type RoundResult = Result<String, RefreshError>;

/// Process-wide coordinator for the session token lifecycle.
///
/// Owns the only mutable copy of [`TokenState`]. All mutation happens on the
/// task that won the single-flight gate (plus `seed`/`clear`, serialized by
/// the same write lock); everything else reads through [`access_token`].
///
/// [`access_token`]: TokenBroker::access_token
pub struct TokenBroker {
    state: RwLock<TokenState>,
    /// Single-flight gate. `Some` while a reissue round is running; callers
    /// arriving mid-round subscribe to the sender and await that round's
    /// outcome instead of starting a second network call.
    inflight: Mutex<Option<broadcast::Sender<RoundResult>>>,
    timer: ExpiryTimer,
    event_tx: broadcast::Sender<SessionEvent>,
    store: Arc<dyn SecretStore>,
    http: reqwest::Client,
    base_url: String,
    refresh_interval: Duration,
}

impl TokenBroker {
    /// Create a broker. The HTTP client carries the standard request timeout,
    /// so the reissue call fails like any other request when the network hangs.
    pub fn new(config: &ClientConfig, store: Arc<dyn SecretStore>) -> Arc<Self> {
        crate::ensure_crypto();
        let (event_tx, _) = broadcast::channel(16);
        Arc::new(Self {
            state: RwLock::new(TokenState::default()),
            inflight: Mutex::new(None),
            timer: ExpiryTimer::new(),
            event_tx,
            store,
            http: reqwest::Client::builder()
                .timeout(config.request_timeout())
                .build()
                .unwrap_or_default(),
            base_url: config.base_url.clone(),
            refresh_interval: config.refresh_interval(),
        })
    }

    /// Current access token, if a session exists.
    pub async fn access_token(&self) -> Option<String> {
        let state = self.state.read().await;
        if state.has_session() {
            Some(state.access_token.clone())
        } else {
            None
        }
    }

    /// Snapshot of the token state.
    pub async fn state(&self) -> TokenState {
        self.state.read().await.clone()
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Load a persisted session from the secret store. Called once at startup
    /// before [`resume`]; does not emit events or arm the timer.
    ///
    /// [`resume`]: TokenBroker::resume
    pub async fn load_persisted(&self) {
        let Some(access) = self.store.get(ACCESS_KEY) else {
            return;
        };
        if access.is_empty() {
            return;
        }
        let issued_at_ms = self
            .store
            .get(ISSUED_AT_KEY)
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(now_ms);

        let mut state = self.state.write().await;
        state.access_token = access;
        state.refresh_token = self.store.get(REFRESH_KEY);
        state.issued_at_ms = issued_at_ms;
        info!("restored persisted session");
    }

    /// Re-derive the proactive refresh deadline from the stored issuance time.
    ///
    /// App-foreground hook: timers do not fire while the process is suspended,
    /// so elapsed time has to be re-evaluated rather than trusting a running
    /// countdown. Fires immediately when the deadline already passed.
    pub async fn resume(self: &Arc<Self>) {
        let issued_at_ms = {
            let state = self.state.read().await;
            if !state.has_session() {
                return;
            }
            state.issued_at_ms
        };
        self.reschedule(issued_at_ms);
    }

    /// Accept an initial token pair from a completed login or signup.
    ///
    /// Same persistence and reschedule side effects as a successful reissue.
    pub async fn seed(self: &Arc<Self>, access_token: String, refresh_token: Option<String>) {
        let issued_at_ms = now_ms();
        {
            let mut state = self.state.write().await;
            state.access_token = access_token;
            state.refresh_token = refresh_token;
            state.issued_at_ms = issued_at_ms;
            self.persist(&state);
        }
        self.reschedule(issued_at_ms);
        let _ = self.event_tx.send(SessionEvent::Refreshed);
        info!("session seeded");
    }

    /// Logout: disarm the timer, clear state, delete persisted secrets.
    /// Idempotent; emits no event.
    pub async fn clear(&self) {
        self.timer.cancel();
        let mut state = self.state.write().await;
        *state = TokenState::default();
        self.store.delete(ACCESS_KEY);
        self.store.delete(REFRESH_KEY);
        self.store.delete(ISSUED_AT_KEY);
        info!("session cleared");
    }

    /// Obtain a fresh access token, coalescing concurrent callers.
    ///
    /// However many tasks call this while a round is in flight, exactly one
    /// reissue request reaches the network per round and every caller observes
    /// that round's outcome. On failure the session is already torn down and
    /// [`SessionEvent::Invalidated`] has fired (once) by the time this returns.
    pub async fn ensure_fresh(self: &Arc<Self>, reason: RefreshReason) -> RoundResult {
        let mut gate = self.inflight.lock().await;

        // Follower: subscribe before releasing the gate, so the running round
        // cannot broadcast and reset between our check and our subscription.
        if let Some(tx) = gate.as_ref() {
            let mut rx = tx.subscribe();
            drop(gate);
            debug!(reason = ?reason, "joining in-flight reissue round");
            return match rx.recv().await {
                Ok(outcome) => outcome,
                // The leader dropped without broadcasting (cancelled task).
                Err(_) => Err(RefreshError::Network("reissue round abandoned".to_owned())),
            };
        }

        // Leader: install the fan-out sender, run the round off-lock,
        // then broadcast the outcome to everyone who joined meanwhile.
        let (tx, _) = broadcast::channel(1);
        *gate = Some(tx);
        drop(gate);

        let outcome = self.run_round(reason).await;

        let mut gate = self.inflight.lock().await;
        if let Some(tx) = gate.take() {
            let _ = tx.send(outcome.clone());
        }
        outcome
    }

    /// Execute one reissue round. Only ever called by the single-flight leader.
    async fn run_round(self: &Arc<Self>, reason: RefreshReason) -> RoundResult {
        let (access, refresh) = {
            let state = self.state.read().await;
            if !state.has_session() {
                debug!(reason = ?reason, "reissue requested with no session");
                return Err(RefreshError::AuthRejected("no session".to_owned()));
            }
            (state.access_token.clone(), state.refresh_token.clone())
        };

        match reissue(&self.http, &self.base_url, &access, refresh.as_deref()).await {
            Ok(tokens) => {
                let issued_at_ms = now_ms();
                {
                    let mut state = self.state.write().await;
                    state.access_token = tokens.access_token.clone();
                    state.issued_at_ms = issued_at_ms;
                    if let Some(rt) = tokens.refresh_token {
                        state.refresh_token = Some(rt);
                    }
                    self.persist(&state);
                }
                self.reschedule(issued_at_ms);
                let _ = self.event_tx.send(SessionEvent::Refreshed);
                info!(reason = ?reason, "access token reissued");
                Ok(tokens.access_token)
            }
            Err(e) => {
                warn!(reason = ?reason, err = %e, "reissue failed, ending session");
                self.clear().await;
                let _ = self.event_tx.send(SessionEvent::Invalidated);
                Err(e)
            }
        }
    }

    /// Arm the proactive timer for `issued_at + refresh_interval`, replacing
    /// any previously armed timer. Fires straight away when overdue.
    fn reschedule(self: &Arc<Self>, issued_at_ms: u64) {
        let cancel = self.timer.arm();
        let delay = fire_delay(issued_at_ms, self.refresh_interval, now_ms());
        let broker = Arc::clone(self);
        tokio::spawn(async move {
            if let Some(delay) = delay {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => return,
                }
            }
            if cancel.is_cancelled() {
                return;
            }
            let _ = broker.ensure_fresh(RefreshReason::Proactive).await;
        });
    }

    /// Write the current session to the secret store. Caller holds the write
    /// lock, so persisted secrets always match a state the broker actually held.
    fn persist(&self, state: &TokenState) {
        self.store.set(ACCESS_KEY, &state.access_token);
        self.store.set(ISSUED_AT_KEY, &state.issued_at_ms.to_string());
        match state.refresh_token {
            Some(ref rt) => self.store.set(REFRESH_KEY, rt),
            None => self.store.delete(REFRESH_KEY),
        }
    }
}

#[cfg(test)]
#[path = "broker_tests.rs"]
mod tests;
