// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end client scenarios.
//!
//! Runs a mock marketplace backend in-process: an authenticated profile
//! route, and a reissue route that rotates the accepted access token
//! (`A1`, `A2`, ...) or rejects outright once the session is revoked.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;

/// A mock marketplace backend bound to an ephemeral port.
pub struct MarketServer {
    pub addr: SocketAddr,
    /// Number of calls the reissue endpoint has received.
    pub reissue_calls: Arc<AtomicU32>,
    accepted: Arc<Mutex<String>>,
    revoked: Arc<AtomicBool>,
    issue_seq: Arc<AtomicU32>,
}

impl MarketServer {
    pub async fn start() -> anyhow::Result<Self> {
        let reissue_calls = Arc::new(AtomicU32::new(0));
        let accepted = Arc::new(Mutex::new(String::new()));
        let revoked = Arc::new(AtomicBool::new(false));
        let issue_seq = Arc::new(AtomicU32::new(0));

        let reissue_count = Arc::clone(&reissue_calls);
        let reissue_accepted = Arc::clone(&accepted);
        let reissue_revoked = Arc::clone(&revoked);
        let reissue_seq = Arc::clone(&issue_seq);
        let profile_accepted = Arc::clone(&accepted);

        let app = Router::new()
            .route(
                "/api/member/reissue",
                post(move || {
                    let count = Arc::clone(&reissue_count);
                    let accepted = Arc::clone(&reissue_accepted);
                    let revoked = Arc::clone(&reissue_revoked);
                    let seq = Arc::clone(&reissue_seq);
                    async move {
                        count.fetch_add(1, Ordering::Relaxed);
                        if revoked.load(Ordering::Relaxed) {
                            return (axum::http::StatusCode::FORBIDDEN, "{}".to_owned());
                        }
                        let n = seq.fetch_add(1, Ordering::Relaxed) + 1;
                        let token = format!("A{n}");
                        *accepted.lock().expect("accepted lock") = token.clone();
                        (
                            axum::http::StatusCode::OK,
                            serde_json::json!({
                                "data": { "accessToken": token, "refreshToken": format!("R{n}") }
                            })
                            .to_string(),
                        )
                    }
                }),
            )
            .route(
                "/api/member/profile",
                get(move |headers: HeaderMap| {
                    let accepted = Arc::clone(&profile_accepted);
                    async move {
                        let current = accepted.lock().expect("accepted lock").clone();
                        let ok = !current.is_empty()
                            && headers
                                .get("authorization")
                                .and_then(|v| v.to_str().ok())
                                .map(|v| v == format!("Bearer {current}"))
                                .unwrap_or(false);
                        if ok {
                            (
                                axum::http::StatusCode::OK,
                                r#"{"data":{"nickname":"tester"}}"#.to_owned(),
                            )
                        } else {
                            (axum::http::StatusCode::UNAUTHORIZED, "{}".to_owned())
                        }
                    }
                }),
            );

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self { addr, reissue_calls, accepted, revoked, issue_seq })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Simulate a login issuing the next token; the backend accepts it from
    /// now on. Returns `(access_token, refresh_token)` for seeding.
    pub fn issue(&self) -> (String, String) {
        let n = self.issue_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let token = format!("A{n}");
        *self.accepted.lock().expect("accepted lock") = token.clone();
        (token, format!("R{n}"))
    }

    /// Stop accepting the current access token (it "expired" server-side).
    pub fn expire_access(&self) {
        self.accepted.lock().expect("accepted lock").clear();
    }

    /// Make the reissue endpoint reject from now on (refresh token revoked).
    pub fn revoke(&self) {
        self.revoked.store(true, Ordering::Relaxed);
    }
}
