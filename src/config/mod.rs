//! Configuration and credential storage

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::{http_client, WeComClient, DEFAULT_API_BASE};
use crate::auth::{Credential, FileTokenCache};

/// Application configuration
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Enterprise ID (`corpid`)
    pub corp_id: String,
    /// Application AgentId
    pub agent_id: String,
    /// Application secret
    pub corp_secret: String,
    /// Override for https://qyapi.weixin.qq.com
    pub api_base: Option<String>,
    /// Overall HTTP request timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl Config {
    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("com", "wecom-notify", "wecom-notify")
            .context("Could not determine config directory")
    }

    /// Default config file path
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Default token cache path
    pub fn default_cache_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.cache_dir().join("token.toml"))
    }

    /// Load configuration from `path`, or the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        if !path.exists() {
            bail!(
                "No config at {}. Run 'wecom-notify configure' first.",
                path.display()
            );
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`, or the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content).context("Failed to write config file")?;

        // Set restrictive permissions on config file (contains the secret)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&path, perms).context("Failed to set config permissions")?;
        }

        Ok(path)
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("corp_id", &self.corp_id),
            ("agent_id", &self.agent_id),
            ("corp_secret", &self.corp_secret),
        ] {
            if value.trim().is_empty() {
                bail!("Config field '{}' is empty", name);
            }
        }
        Ok(())
    }

    pub fn credential(&self) -> Credential {
        Credential::new(&self.corp_id, &self.agent_id, &self.corp_secret)
    }

    /// Client backed by a file token cache at `cache_path`, or the default location.
    pub fn build_client(&self, cache_path: Option<&Path>) -> Result<WeComClient<FileTokenCache>> {
        let cache_path = match cache_path {
            Some(p) => p.to_path_buf(),
            None => Self::default_cache_path()?,
        };
        let http = http_client(self.timeout_secs.map(Duration::from_secs))?;
        let client = WeComClient::with_http(self.credential(), FileTokenCache::new(cache_path), http)
            .with_api_base(self.api_base.as_deref().unwrap_or(DEFAULT_API_BASE));
        Ok(client)
    }
}
