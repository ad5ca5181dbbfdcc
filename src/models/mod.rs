//! Data models for WeCom requests and responses

mod media;
mod message;
mod user;

pub use media::*;
pub use message::*;
pub use user::*;

use serde::Deserialize;

/// `errcode` / `errmsg` pair present in every WeCom response body
#[derive(Debug, Default, Deserialize)]
pub struct ApiStatus {
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
}

impl ApiStatus {
    /// Sentinel errcode for a body whose status fields are malformed
    pub const MALFORMED: i64 = -1;

    /// Read the status fields out of an arbitrary response body.
    /// Missing fields mean success; fields of the wrong type do not.
    pub fn of(body: &serde_json::Value) -> Self {
        Self::deserialize(body).unwrap_or_else(|e| Self {
            errcode: Self::MALFORMED,
            errmsg: format!("malformed response status: {}", e),
        })
    }

    pub fn is_ok(&self) -> bool {
        self.errcode == 0
    }
}
