// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The reissue network call: `POST /api/member/reissue`.

use serde::Deserialize;

use crate::error::RefreshError;

/// Tokens returned by a successful reissue (or login).
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access_token: String,
    /// Present only when the backend rotated the refresh token.
    pub refresh_token: Option<String>,
}

/// Success envelope: `{ "data": { "accessToken": ..., "refreshToken"?: ... } }`.
#[derive(Debug, Deserialize)]
struct ReissueResponse {
    data: ReissueData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReissueData {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Perform a single reissue call with the currently stored credentials.
///
/// The client passed in carries the standard request timeout, so a hung
/// reissue fails the same way any other request would.
pub async fn reissue(
    client: &reqwest::Client,
    base_url: &str,
    access_token: &str,
    refresh_token: Option<&str>,
) -> Result<IssuedTokens, RefreshError> {
    let mut req = client.post(format!("{base_url}/api/member/reissue"));
    if !access_token.is_empty() {
        req = req.bearer_auth(access_token);
    }
    if let Some(rt) = refresh_token {
        req = req.header("Refresh-Token", rt);
    }

    let resp = req.send().await.map_err(|e| RefreshError::Network(e.to_string()))?;
    let status = resp.status();

    if status.as_u16() == 401 || status.as_u16() == 403 {
        let body = resp.text().await.unwrap_or_default();
        return Err(RefreshError::AuthRejected(format!("{status}: {body}")));
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(RefreshError::Network(format!("reissue returned {status}: {body}")));
    }

    let parsed: ReissueResponse = resp
        .json()
        .await
        .map_err(|e| RefreshError::MalformedResponse(e.to_string()))?;
    if parsed.data.access_token.is_empty() {
        return Err(RefreshError::MalformedResponse("missing accessToken".to_owned()));
    }

    Ok(IssuedTokens {
        access_token: parsed.data.access_token,
        refresh_token: parsed.data.refresh_token,
    })
}
