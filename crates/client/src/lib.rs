// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Motora marketplace REST client with managed session tokens.
//!
//! The interesting part lives in [`auth`]: a single-flight token broker that
//! keeps the short-lived access token fresh across the process lifetime,
//! coordinating timer-driven and 401-driven reissues so that overlapping
//! callers never stampede the reissue endpoint. [`api::ApiClient`] wraps every
//! outgoing request, attaching the bearer token and driving the bounded
//! 401-retry path through the broker.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;

use std::sync::{Arc, Once};

use crate::api::ApiClient;
use crate::auth::broker::TokenBroker;
use crate::auth::store::{FileSecretStore, MemorySecretStore, SecretStore};
use crate::config::ClientConfig;

static CRYPTO_INIT: Once = Once::new();

/// Install the rustls crypto provider (needed for reqwest even on plain HTTP).
/// Safe to call multiple times; only the first call has effect.
pub(crate) fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Build the client stack: token broker plus request gatekeeper.
///
/// Uses a [`FileSecretStore`] when `persist_path` is configured (sessions
/// survive process restarts), otherwise an in-memory store. Loads any
/// persisted session and resumes the proactive refresh schedule from the
/// persisted issuance time — firing immediately if the deadline passed while
/// the process was down.
pub async fn init(config: ClientConfig) -> anyhow::Result<(ApiClient, Arc<TokenBroker>)> {
    let store: Arc<dyn SecretStore> = match config.persist_path {
        Some(ref path) => Arc::new(FileSecretStore::open(path)),
        None => Arc::new(MemorySecretStore::default()),
    };

    let broker = TokenBroker::new(&config, store);
    broker.load_persisted().await;
    broker.resume().await;

    let client = ApiClient::new(&config, Arc::clone(&broker));
    Ok((client, broker))
}
