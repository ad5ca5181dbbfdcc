//! Token storage and management

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Seconds shaved off the vendor TTL so a token is never used right at its deadline.
pub const EXPIRY_MARGIN_SECS: i64 = 10;

/// TTL assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_TTL_SECS: i64 = 7200;

/// Cached access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    pub token: String,
    /// Unix timestamp (seconds) after which the token must not be used.
    pub expires_at: i64,
    /// Fingerprint of the credential the token was issued for.
    pub owner: String,
}

impl CachedToken {
    pub fn new(token: String, expires_in_secs: i64, owner: String) -> Self {
        let expires_at = chrono::Utc::now()
            .timestamp()
            .saturating_add(expires_in_secs)
            .saturating_sub(EXPIRY_MARGIN_SECS);
        Self {
            token,
            expires_at,
            owner,
        }
    }

    pub fn is_expired(&self) -> bool {
        chrono::Utc::now().timestamp() >= self.expires_at
    }

    /// Usable by the credential with fingerprint `owner`.
    pub fn is_valid_for(&self, owner: &str) -> bool {
        !self.token.is_empty() && self.owner == owner && !self.is_expired()
    }
}

/// Token cache trait for different storage backends
pub trait TokenCache: Send {
    fn load(&self) -> Result<Option<CachedToken>>;
    fn store(&mut self, token: &CachedToken) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
}

/// Process-local cache, lost when the client is dropped.
#[derive(Debug, Default, Clone)]
pub struct MemoryTokenCache {
    token: Option<CachedToken>,
}

impl MemoryTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a token already cached.
    pub fn with_token(token: CachedToken) -> Self {
        Self { token: Some(token) }
    }
}

impl TokenCache for MemoryTokenCache {
    fn load(&self) -> Result<Option<CachedToken>> {
        Ok(self.token.clone())
    }

    fn store(&mut self, token: &CachedToken) -> Result<()> {
        self.token = Some(token.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.token = None;
        Ok(())
    }
}

/// Cache persisted as a small TOML file, shared between process runs.
#[derive(Debug, Clone)]
pub struct FileTokenCache {
    path: PathBuf,
}

impl FileTokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenCache for FileTokenCache {
    fn load(&self) -> Result<Option<CachedToken>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| Error::Cache(format!("read {}: {}", self.path.display(), e)))?;
        let token = toml::from_str(&content)
            .map_err(|e| Error::Cache(format!("parse {}: {}", self.path.display(), e)))?;
        Ok(Some(token))
    }

    fn store(&mut self, token: &CachedToken) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| Error::Cache(format!("create {}: {}", dir.display(), e)))?;
        }

        let content = toml::to_string_pretty(token)
            .map_err(|e| Error::Cache(format!("serialize token: {}", e)))?;
        fs::write(&self.path, content)
            .map_err(|e| Error::Cache(format!("write {}: {}", self.path.display(), e)))?;

        // Token grants API access; keep it private to the user
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&self.path, perms)
                .map_err(|e| Error::Cache(format!("chmod {}: {}", self.path.display(), e)))?;
        }

        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Cache(format!(
                "remove {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}
