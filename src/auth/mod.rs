//! Authentication module for WeCom
//!
//! Exchanges the application credential for an access token at the
//! `gettoken` endpoint and keeps it in a pluggable cache.

mod gettoken;
pub mod tokens;

pub(crate) use gettoken::fetch_access_token;
pub use tokens::{CachedToken, FileTokenCache, MemoryTokenCache, TokenCache};

use sha2::{Digest, Sha256};
use std::fmt;

/// Application credential from the WeCom admin console
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Enterprise ID (`corpid`)
    pub corp_id: String,
    /// Application AgentId
    pub agent_id: String,
    /// Application secret (`corpsecret`)
    pub corp_secret: String,
}

impl Credential {
    pub fn new(
        corp_id: impl Into<String>,
        agent_id: impl Into<String>,
        corp_secret: impl Into<String>,
    ) -> Self {
        Self {
            corp_id: corp_id.into(),
            agent_id: agent_id.into(),
            corp_secret: corp_secret.into(),
        }
    }

    /// Hex SHA-256 of `corp_id:corp_secret`, recorded next to cached tokens
    /// so a changed secret never reuses a stale token.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.corp_id.as_bytes());
        hasher.update(b":");
        hasher.update(self.corp_secret.as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("corp_id", &self.corp_id)
            .field("agent_id", &self.agent_id)
            .field("corp_secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_tracks_secret() {
        let a = Credential::new("corp", "1000002", "secret-a");
        let b = Credential::new("corp", "1000002", "secret-b");

        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_debug_hides_secret() {
        let cred = Credential::new("corp", "1000002", "hunter2");
        let shown = format!("{:?}", cred);
        assert!(shown.contains("corp"));
        assert!(!shown.contains("hunter2"));
    }
}
