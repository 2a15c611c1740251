// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session token lifecycle: single-flight reissue, proactive expiry timing,
//! and durable secret storage.
//!
//! One [`broker::TokenBroker`] per process owns the token state. Every path
//! that can discover a stale token — the expiry timer, or any request hitting
//! a 401 — funnels into the same `ensure_fresh` round, so the reissue endpoint
//! sees at most one call no matter how many tasks notice expiry at once.

pub mod broker;
pub mod reissue;
pub mod scheduler;
pub mod store;

use std::time::{SystemTime, UNIX_EPOCH};

/// In-memory record of the current session credentials.
///
/// `access_token` is empty iff no session exists, and `issued_at_ms` is
/// non-zero exactly when `access_token` is non-empty.
#[derive(Debug, Clone, Default)]
pub struct TokenState {
    /// Current bearer credential. Empty string means "no session".
    pub access_token: String,
    /// Longer-lived credential for reissue; absent if the backend issued none.
    pub refresh_token: Option<String>,
    /// Wall-clock time of the last successful (re)issuance, epoch ms.
    /// Zero before first login.
    pub issued_at_ms: u64,
}

impl TokenState {
    pub fn has_session(&self) -> bool {
        !self.access_token.is_empty()
    }
}

/// Why a reissue round was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    /// Timer-driven, ahead of expiry.
    Proactive,
    /// Driven by an observed 401/403.
    Reactive,
}

/// Events broadcast by the token broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A fresh access token is active (login seed or successful reissue).
    Refreshed,
    /// The session ended: a reissue round failed terminally. Fired exactly
    /// once per round regardless of how many callers were waiting on it;
    /// the UI reacts by forcing a re-login.
    Invalidated,
}

/// Route prefixes that must never carry a bearer token and must never trigger
/// the 401 retry path. Includes the reissue route itself to rule out
/// refresh-retry loops on the refresh call.
pub const AUTH_EXEMPT_PREFIXES: &[&str] = &[
    "/api/member/login",
    "/api/member/signup",
    "/api/member/email",
    "/api/member/password",
    "/api/member/reissue",
];

/// Whether a request path is exempt from authentication.
pub fn is_auth_exempt(path: &str) -> bool {
    AUTH_EXEMPT_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Current wall-clock time as epoch milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}
