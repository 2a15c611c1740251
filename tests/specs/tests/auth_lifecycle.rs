// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end session lifecycle scenarios against a mock marketplace backend.

use std::sync::atomic::Ordering;
use std::time::Duration;

use motora::auth::store::{FileSecretStore, SecretStore, ACCESS_KEY};
use motora::auth::SessionEvent;
use motora::config::ClientConfig;
use motora_specs::MarketServer;

fn test_config(server: &MarketServer, persist: &std::path::Path) -> ClientConfig {
    let mut config = ClientConfig::new(server.base_url());
    config.refresh_interval_secs = 3600;
    config.request_timeout_secs = 5;
    config.persist_path = Some(persist.join("secrets.json"));
    config
}

#[tokio::test]
async fn session_survives_process_restart() -> anyhow::Result<()> {
    let server = MarketServer::start().await?;
    let dir = tempfile::tempdir()?;
    let config = test_config(&server, dir.path());

    // "First launch": login and seed.
    {
        let (client, broker) = motora::init(config.clone()).await?;
        let (access, refresh) = server.issue();
        broker.seed(access, Some(refresh)).await;

        let profile = client.get_json("/api/member/profile").await?;
        assert_eq!(profile["data"]["nickname"], "tester");
    }

    // "Second launch": same persist path, session restored without reissue.
    let (client, broker) = motora::init(config).await?;
    assert_eq!(broker.access_token().await, Some("A1".to_owned()));

    let profile = client.get_json("/api/member/profile").await?;
    assert_eq!(profile["data"]["nickname"], "tester");
    assert_eq!(server.reissue_calls.load(Ordering::Relaxed), 0);
    Ok(())
}

#[tokio::test]
async fn proactive_rotation_keeps_requests_working() -> anyhow::Result<()> {
    let server = MarketServer::start().await?;
    let dir = tempfile::tempdir()?;
    let mut config = test_config(&server, dir.path());
    config.refresh_interval_secs = 1;

    let (client, broker) = motora::init(config).await?;
    let (access, refresh) = server.issue();
    broker.seed(access, Some(refresh)).await;
    assert_eq!(broker.access_token().await, Some("A1".to_owned()));

    // The scheduler fires one second after issuance and rotates to A2.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(broker.access_token().await, Some("A2".to_owned()));
    assert!(server.reissue_calls.load(Ordering::Relaxed) >= 1);

    let profile = client.get_json("/api/member/profile").await?;
    assert_eq!(profile["data"]["nickname"], "tester");
    Ok(())
}

#[tokio::test]
async fn expired_access_token_recovers_reactively() -> anyhow::Result<()> {
    let server = MarketServer::start().await?;
    let dir = tempfile::tempdir()?;
    let config = test_config(&server, dir.path());

    let (client, broker) = motora::init(config).await?;
    let (access, refresh) = server.issue();
    broker.seed(access, Some(refresh)).await;

    // Backend drops the session token; next request 401s, the client
    // reissues once and retries with A2.
    server.expire_access();
    let profile = client.get_json("/api/member/profile").await?;
    assert_eq!(profile["data"]["nickname"], "tester");
    assert_eq!(server.reissue_calls.load(Ordering::Relaxed), 1);
    assert_eq!(broker.access_token().await, Some("A2".to_owned()));
    Ok(())
}

#[tokio::test]
async fn revoked_refresh_token_ends_the_session() -> anyhow::Result<()> {
    let server = MarketServer::start().await?;
    let dir = tempfile::tempdir()?;
    let config = test_config(&server, dir.path());
    let persist = config.persist_path.clone().unwrap_or_default();

    let (client, broker) = motora::init(config).await?;
    let (access, refresh) = server.issue();
    broker.seed(access, Some(refresh)).await;
    let mut events = broker.subscribe();

    server.expire_access();
    server.revoke();

    let err = client.get_json("/api/member/profile").await.expect_err("session ends");
    assert_eq!(err.status(), Some(401));

    let event = events.recv().await?;
    assert_eq!(event, SessionEvent::Invalidated);
    assert_eq!(broker.access_token().await, None);

    // Secrets are gone from disk too: a restart comes up logged out.
    let store = FileSecretStore::open(&persist);
    assert_eq!(store.get(ACCESS_KEY), None);
    Ok(())
}
