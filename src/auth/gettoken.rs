//! Access token exchange
//!
//! `GET /cgi-bin/gettoken?corpid=..&corpsecret=..` returns an access token
//! that every other endpoint expects as the `access_token` query parameter.

use serde::Deserialize;

use super::tokens::DEFAULT_TTL_SECS;
use super::Credential;
use crate::error::{Error, Result};

/// Response from the gettoken endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
    access_token: Option<String>,
    expires_in: Option<i64>,
}

/// Request a fresh access token.
/// Returns (access_token, expires_in_secs).
pub(crate) async fn fetch_access_token(
    http: &reqwest::Client,
    api_base: &str,
    credential: &Credential,
) -> Result<(String, i64)> {
    let url = format!("{}/cgi-bin/gettoken", api_base);
    tracing::debug!("Requesting access token from {}", url);

    let resp = http
        .get(&url)
        .query(&[
            ("corpid", credential.corp_id.as_str()),
            ("corpsecret", credential.corp_secret.as_str()),
        ])
        .send()
        .await
        .map_err(|e| {
            Error::Auth(format!(
                "gettoken request failed: {}",
                e.without_url()
            ))
        })?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Auth(format!(
            "gettoken returned HTTP {}: {}",
            status.as_u16(),
            body
        )));
    }

    let body: TokenResponse = resp
        .json()
        .await
        .map_err(|e| {
            Error::Auth(format!(
                "failed to parse gettoken response: {}",
                e.without_url()
            ))
        })?;

    if body.errcode != 0 {
        return Err(Error::Auth(format!(
            "gettoken errcode {}: {}",
            body.errcode, body.errmsg
        )));
    }

    let token = body
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::Auth("gettoken response missing 'access_token'".to_string()))?;

    Ok((token, body.expires_in.unwrap_or(DEFAULT_TTL_SECS)))
}
