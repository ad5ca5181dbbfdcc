//! Authenticated HTTP client for the WeCom API
//!
//! Wraps reqwest::Client with access token injection and a cached token
//! that is refreshed lazily when missing or expired.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::auth::{fetch_access_token, CachedToken, Credential, TokenCache};
use crate::error::{Error, Result};
use crate::models::ApiStatus;

pub const DEFAULT_API_BASE: &str = "https://qyapi.weixin.qq.com";

/// errcodes meaning the access token itself was rejected
const TOKEN_INVALID: i64 = 40014;
const TOKEN_EXPIRED: i64 = 42001;

/// WeCom application client.
///
/// The cache lives behind an async mutex that is held for the whole
/// refresh, so concurrent callers share one token request.
pub struct WeComClient<C> {
    http: reqwest::Client,
    api_base: String,
    credential: Credential,
    owner: String,
    cache: Mutex<C>,
}

impl<C: TokenCache> WeComClient<C> {
    pub fn new(credential: Credential, cache: C) -> Self {
        Self::with_http(credential, cache, reqwest::Client::new())
    }

    /// Build with a preconfigured reqwest client (timeouts, proxy).
    pub fn with_http(credential: Credential, cache: C, http: reqwest::Client) -> Self {
        let owner = credential.fingerprint();
        Self {
            http,
            api_base: DEFAULT_API_BASE.to_string(),
            credential,
            owner,
            cache: Mutex::new(cache),
        }
    }

    /// Point the client at another host, e.g. a proxy or a mock server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Return a valid access token, refreshing the cache if needed.
    pub async fn get_token(&self) -> Result<String> {
        let mut cache = self.cache.lock().await;

        match cache.load() {
            Ok(Some(token)) if token.is_valid_for(&self.owner) => {
                tracing::debug!("Using cached access token");
                return Ok(token.token);
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Ignoring unreadable token cache: {}", e),
        }

        tracing::info!("Access token missing or expired, refreshing...");
        let (token, expires_in) =
            fetch_access_token(&self.http, &self.api_base, &self.credential).await?;

        let cached = CachedToken::new(token.clone(), expires_in, self.owner.clone());
        if let Err(e) = cache.store(&cached) {
            tracing::warn!("Failed to persist access token: {}", e);
        }
        tracing::info!("Access token refreshed (expires in {}s)", expires_in);

        Ok(token)
    }

    /// Drop the cached token so the next call fetches a new one.
    pub async fn invalidate_token(&self) -> Result<()> {
        self.cache.lock().await.clear()
    }

    /// Current cache content, valid or not.
    pub async fn cached_token(&self) -> Result<Option<CachedToken>> {
        self.cache.lock().await.load()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/cgi-bin/{}", self.api_base, path)
    }

    /// GET `/cgi-bin/{path}` with the access token and extra query pairs.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let token = self.get_token().await?;
        let url = self.url(path);
        tracing::debug!("WeCom GET {}", url);

        let resp = self
            .http
            .get(&url)
            .query(&[("access_token", token.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|source| Error::Http {
                url: url.clone(),
                source: source.without_url(),
            })?;

        read_json(resp, &url).await
    }

    /// POST a JSON body to `/cgi-bin/{path}` with the access token.
    pub(crate) async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let token = self.get_token().await?;
        let url = self.url(path);
        tracing::debug!("WeCom POST {}", url);

        let resp = self
            .http
            .post(&url)
            .query(&[("access_token", token.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|source| Error::Http {
                url: url.clone(),
                source: source.without_url(),
            })?;

        read_json(resp, &url).await
    }

    /// POST a multipart form to `/cgi-bin/{path}` with the access token.
    pub(crate) async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        form: reqwest::multipart::Form,
    ) -> Result<T> {
        let token = self.get_token().await?;
        let url = self.url(path);
        tracing::debug!("WeCom POST (multipart) {}", url);

        let resp = self
            .http
            .post(&url)
            .query(&[("access_token", token.as_str())])
            .query(query)
            .multipart(form)
            .send()
            .await
            .map_err(|source| Error::Http {
                url: url.clone(),
                source: source.without_url(),
            })?;

        read_json(resp, &url).await
    }

    /// Clear the cache when the vendor says the token is no longer good.
    pub(crate) async fn note_status(&self, status: &ApiStatus) {
        if status.errcode == TOKEN_INVALID || status.errcode == TOKEN_EXPIRED {
            tracing::warn!(
                "Access token rejected (errcode {}), clearing cache",
                status.errcode
            );
            if let Err(e) = self.invalidate_token().await {
                tracing::warn!("Failed to clear token cache: {}", e);
            }
        }
    }
}

/// Build a reqwest client with an optional overall request timeout.
pub fn http_client(timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().map_err(|source| Error::Http {
        url: String::new(),
        source: source.without_url(),
    })
}

/// Check HTTP status and decode the JSON body.
async fn read_json<T: DeserializeOwned>(resp: reqwest::Response, url: &str) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Status {
            status: status.as_u16(),
            url: url.to_string(),
            body,
        });
    }
    resp.json().await.map_err(|source| Error::Http {
        url: url.to_string(),
        source: source.without_url(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::MemoryTokenCache;
    use mockito::{Matcher, Server};

    pub(crate) fn credential() -> Credential {
        Credential::new("corp", "1000002", "secret")
    }

    pub(crate) fn path(p: &str) -> Matcher {
        Matcher::Regex(format!("^{}", p))
    }

    /// Client with a fresh token already in its memory cache.
    pub(crate) fn authed_client(server: &Server) -> WeComClient<MemoryTokenCache> {
        let cred = credential();
        let token = CachedToken::new("cached-token".to_string(), 7200, cred.fingerprint());
        WeComClient::new(cred, MemoryTokenCache::with_token(token)).with_api_base(server.url())
    }

    #[tokio::test]
    async fn test_cached_token_skips_network() {
        let mut server = Server::new_async().await;
        let gettoken = server
            .mock("GET", path("/cgi-bin/gettoken"))
            .expect(0)
            .create_async()
            .await;

        let client = authed_client(&server);
        assert_eq!(client.get_token().await.unwrap(), "cached-token");
        assert_eq!(client.get_token().await.unwrap(), "cached-token");

        gettoken.assert_async().await;
    }

    #[tokio::test]
    async fn test_absent_token_refreshes_once() {
        let mut server = Server::new_async().await;
        let gettoken = server
            .mock("GET", path("/cgi-bin/gettoken"))
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("corpid".into(), "corp".into()),
                Matcher::UrlEncoded("corpsecret".into(), "secret".into()),
            ]))
            .with_header("content-type", "application/json")
            .with_body(r#"{"errcode":0,"errmsg":"ok","access_token":"fresh","expires_in":7200}"#)
            .expect(1)
            .create_async()
            .await;

        let client =
            WeComClient::new(credential(), MemoryTokenCache::new()).with_api_base(server.url());
        assert_eq!(client.get_token().await.unwrap(), "fresh");
        // Second call is served from the cache.
        assert_eq!(client.get_token().await.unwrap(), "fresh");

        gettoken.assert_async().await;

        let cached = client.cached_token().await.unwrap().unwrap();
        assert_eq!(cached.token, "fresh");
        assert_eq!(cached.owner, credential().fingerprint());
        assert!(!cached.is_expired());
    }

    #[tokio::test]
    async fn test_expired_token_refreshes_once() {
        let mut server = Server::new_async().await;
        let gettoken = server
            .mock("GET", path("/cgi-bin/gettoken"))
            .with_body(r#"{"errcode":0,"errmsg":"ok","access_token":"renewed","expires_in":7200}"#)
            .expect(1)
            .create_async()
            .await;

        let cred = credential();
        let stale = CachedToken {
            token: "stale".to_string(),
            expires_at: chrono::Utc::now().timestamp() - 1,
            owner: cred.fingerprint(),
        };
        let client = WeComClient::new(cred, MemoryTokenCache::with_token(stale))
            .with_api_base(server.url());

        assert_eq!(client.get_token().await.unwrap(), "renewed");
        gettoken.assert_async().await;
        assert_eq!(
            client.cached_token().await.unwrap().unwrap().token,
            "renewed"
        );
    }

    #[tokio::test]
    async fn test_token_from_other_secret_is_ignored() {
        let mut server = Server::new_async().await;
        let gettoken = server
            .mock("GET", path("/cgi-bin/gettoken"))
            .with_body(r#"{"errcode":0,"errmsg":"ok","access_token":"mine","expires_in":7200}"#)
            .expect(1)
            .create_async()
            .await;

        let foreign = CachedToken::new(
            "foreign".to_string(),
            7200,
            Credential::new("corp", "1000002", "old-secret").fingerprint(),
        );
        let client = WeComClient::new(credential(), MemoryTokenCache::with_token(foreign))
            .with_api_base(server.url());

        assert_eq!(client.get_token().await.unwrap(), "mine");
        gettoken.assert_async().await;
    }

    #[tokio::test]
    async fn test_gettoken_errcode_is_auth_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", path("/cgi-bin/gettoken"))
            .with_body(r#"{"errcode":40013,"errmsg":"invalid corpid"}"#)
            .create_async()
            .await;

        let client =
            WeComClient::new(credential(), MemoryTokenCache::new()).with_api_base(server.url());
        let err = client.get_token().await.unwrap_err();
        assert!(matches!(err, Error::Auth(ref msg) if msg.contains("40013")));
        assert_eq!(client.cached_token().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_gettoken_missing_token_is_auth_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", path("/cgi-bin/gettoken"))
            .with_body(r#"{"errcode":0,"errmsg":"ok"}"#)
            .create_async()
            .await;

        let client =
            WeComClient::new(credential(), MemoryTokenCache::new()).with_api_base(server.url());
        assert!(matches!(client.get_token().await, Err(Error::Auth(_))));
    }

    #[tokio::test]
    async fn test_gettoken_http_failure_is_auth_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", path("/cgi-bin/gettoken"))
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let client =
            WeComClient::new(credential(), MemoryTokenCache::new()).with_api_base(server.url());
        let err = client.get_token().await.unwrap_err();
        assert!(matches!(err, Error::Auth(ref msg) if msg.contains("502")));
    }

    /// Text of an error and every error in its source chain.
    fn error_chain(err: &Error) -> String {
        let mut text = err.to_string();
        let mut source = std::error::Error::source(err);
        while let Some(inner) = source {
            text.push_str(" | ");
            text.push_str(&inner.to_string());
            source = inner.source();
        }
        text
    }

    #[tokio::test]
    async fn test_unreachable_token_endpoint_hides_secret() {
        let client = WeComClient::new(
            Credential::new("corp", "1000002", "TOPSECRET"),
            MemoryTokenCache::new(),
        )
        .with_api_base("http://127.0.0.1:9");

        let err = client.get_token().await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
        assert!(!error_chain(&err).contains("TOPSECRET"));
    }

    #[tokio::test]
    async fn test_unreachable_api_hides_access_token() {
        let cred = credential();
        let token = CachedToken::new("SECRET-TOKEN".to_string(), 7200, cred.fingerprint());
        let client = WeComClient::new(cred, MemoryTokenCache::with_token(token))
            .with_api_base("http://127.0.0.1:9");

        let err = client.get_user_info("u1").await.unwrap_err();
        assert!(matches!(err, Error::Http { ref url, .. } if url.ends_with("/cgi-bin/user/get")));
        assert!(!error_chain(&err).contains("SECRET-TOKEN"));
    }

    #[tokio::test]
    async fn test_file_cache_shared_between_clients() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("token.toml");

        let mut server = Server::new_async().await;
        let gettoken = server
            .mock("GET", path("/cgi-bin/gettoken"))
            .with_body(r#"{"errcode":0,"errmsg":"ok","access_token":"persisted","expires_in":7200}"#)
            .expect(1)
            .create_async()
            .await;

        let first = WeComClient::new(credential(), crate::auth::FileTokenCache::new(&cache_path))
            .with_api_base(server.url());
        assert_eq!(first.get_token().await.unwrap(), "persisted");

        let second = WeComClient::new(credential(), crate::auth::FileTokenCache::new(&cache_path))
            .with_api_base(server.url());
        assert_eq!(second.get_token().await.unwrap(), "persisted");

        gettoken.assert_async().await;
    }

    #[tokio::test]
    async fn test_corrupt_file_cache_falls_back_to_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("token.toml");
        std::fs::write(&cache_path, "garbage = [").unwrap();

        let mut server = Server::new_async().await;
        let gettoken = server
            .mock("GET", path("/cgi-bin/gettoken"))
            .with_body(r#"{"errcode":0,"errmsg":"ok","access_token":"fixed","expires_in":7200}"#)
            .expect(1)
            .create_async()
            .await;

        let client = WeComClient::new(credential(), crate::auth::FileTokenCache::new(&cache_path))
            .with_api_base(server.url());
        assert_eq!(client.get_token().await.unwrap(), "fixed");
        gettoken.assert_async().await;
        assert_eq!(
            client.cached_token().await.unwrap().unwrap().token,
            "fixed"
        );
    }

    #[test]
    fn test_api_base_trailing_slash() {
        let client = WeComClient::new(credential(), MemoryTokenCache::new())
            .with_api_base("http://localhost:1234/");
        assert_eq!(client.api_base(), "http://localhost:1234");
        assert_eq!(client.url("message/send"), "http://localhost:1234/cgi-bin/message/send");
    }
}
