// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP gatekeeper for the marketplace API.
//!
//! Attaches the current bearer token to every non-exempt request and, on a
//! 401/403, drives one bounded retry through the token broker: refresh once,
//! re-send once, then surface whatever comes back. Auth-exempt routes (login,
//! signup, reissue itself) never carry the header and never enter the retry
//! path, which is what rules out refresh loops on the reissue call.

use std::sync::Arc;

use reqwest::Method;
use tracing::{debug, warn};

use crate::auth::broker::TokenBroker;
use crate::auth::{is_auth_exempt, RefreshReason};
use crate::config::ClientConfig;
use crate::error::ApiError;

pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    broker: Arc<TokenBroker>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, broker: Arc<TokenBroker>) -> Self {
        crate::ensure_crypto();
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .unwrap_or_default();
        Self { base_url: config.base_url.clone(), http, broker }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get_json(&self, path: &str) -> Result<serde_json::Value, ApiError> {
        self.execute(Method::GET, path, None).await
    }

    pub async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ApiError> {
        self.execute(Method::POST, path, Some(body)).await
    }

    pub async fn put_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ApiError> {
        self.execute(Method::PUT, path, Some(body)).await
    }

    pub async fn delete_json(&self, path: &str) -> Result<serde_json::Value, ApiError> {
        self.execute(Method::DELETE, path, None).await
    }

    /// Send one logical request with at most one auth retry.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value, ApiError> {
        let exempt = is_auth_exempt(path);
        // Per logical request: one auth retry, ever. A second 401 surfaces
        // as-is even if the refresh that preceded it succeeded.
        let mut retried = false;

        loop {
            let mut req = self.http.request(method.clone(), self.url(path));
            if let Some(b) = body {
                req = req.json(b);
            }
            if !exempt {
                if let Some(token) = self.broker.access_token().await {
                    req = req.bearer_auth(token);
                }
            }

            let resp = req.send().await?;
            let status = resp.status();

            if (status.as_u16() == 401 || status.as_u16() == 403) && !exempt && !retried {
                retried = true;
                match self.broker.ensure_fresh(RefreshReason::Reactive).await {
                    Ok(_) => {
                        debug!(path, %status, "auth failure, retrying with fresh token");
                        continue;
                    }
                    Err(e) => {
                        // Session already invalidated by the broker; surface
                        // the original auth failure.
                        warn!(path, %status, err = %e, "auth failure and refresh failed");
                        let body = resp.text().await.unwrap_or_default();
                        return Err(ApiError::Status { status: status.as_u16(), body });
                    }
                }
            }

            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ApiError::Status { status: status.as_u16(), body });
            }

            let bytes = resp.bytes().await?;
            if bytes.is_empty() {
                return Ok(serde_json::Value::Null);
            }
            return serde_json::from_slice(&bytes).map_err(|e| ApiError::Transport(e.to_string()));
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
