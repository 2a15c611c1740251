// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Terminal causes of a failed reissue round.
///
/// Clone, because one round's outcome fans out to every waiter of the
/// single-flight gate. Callers of `ensure_fresh` rarely need to distinguish
/// the kinds — every variant means the session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    /// Connectivity failure, DNS error, or timeout on the reissue call.
    Network(String),
    /// The reissue endpoint rejected the stored credentials (401/403).
    AuthRejected(String),
    /// 2xx response without the expected token payload.
    MalformedResponse(String),
}

impl fmt::Display for RefreshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "reissue network failure: {msg}"),
            Self::AuthRejected(msg) => write!(f, "reissue rejected: {msg}"),
            Self::MalformedResponse(msg) => write!(f, "malformed reissue response: {msg}"),
        }
    }
}

impl std::error::Error for RefreshError {}

/// Errors surfaced by the request gatekeeper.
#[derive(Debug)]
pub enum ApiError {
    /// The request could not be sent or its body could not be read.
    Transport(String),
    /// Non-2xx response after any auth retry budget was spent. A 401/403 here
    /// means the retry path is exhausted (or the route is auth-exempt); the
    /// gatekeeper never refreshes twice for one logical request.
    Status { status: u16, body: String },
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(_) => None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Status { status, body } => write!(f, "request failed ({status}): {body}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}
