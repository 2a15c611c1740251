// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default interval between token issuance and proactive reissue (25 minutes).
const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 1500;

/// Default per-request timeout. The reissue call shares this policy.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Configuration for the marketplace client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the marketplace API (no trailing slash).
    pub base_url: String,

    /// Seconds after issuance at which the access token is proactively reissued.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Path to persist session secrets (JSON file). When unset, the session
    /// lives only as long as the process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persist_path: Option<PathBuf>,
}

fn default_refresh_interval() -> u64 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl ClientConfig {
    /// Config with defaults for the given API base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            persist_path: None,
        }
    }

    /// Config with defaults, overridden by `MOTORA_REFRESH_INTERVAL_SECS` and
    /// `MOTORA_REQUEST_TIMEOUT_SECS` when set.
    pub fn from_env(base_url: impl Into<String>) -> Self {
        let mut config = Self::new(base_url);
        if let Some(secs) = env_u64("MOTORA_REFRESH_INTERVAL_SECS") {
            config.refresh_interval_secs = secs;
        }
        if let Some(secs) = env_u64("MOTORA_REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = secs;
        }
        config
    }

    pub fn refresh_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
