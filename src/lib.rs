//! Send text, Markdown, image and file messages through a WeCom
//! (WeChat Work) application, caching the access token between calls.
//!
//! ```no_run
//! use wecom_notify::{Credential, MemoryTokenCache, WeComClient};
//!
//! # async fn demo() -> wecom_notify::Result<()> {
//! let client = WeComClient::new(
//!     Credential::new("ww0123456789", "1000002", "app-secret"),
//!     MemoryTokenCache::new(),
//! );
//! client.send_text("deploy finished", &["ZhangSan", "LiSi"]).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;

pub use api::WeComClient;
pub use auth::{CachedToken, Credential, FileTokenCache, MemoryTokenCache, TokenCache};
pub use config::Config;
pub use error::{Error, Result};
pub use models::{MediaKind, Message, SendOptions};
