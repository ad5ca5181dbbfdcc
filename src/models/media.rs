//! Media upload models

use serde::Deserialize;

/// Upload type accepted by `/cgi-bin/media/upload`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    File,
}

/// Smallest file the vendor accepts, bytes
pub const MIN_MEDIA_SIZE: u64 = 5;

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::File => "file",
        }
    }

    /// Largest upload the vendor accepts for this kind, bytes
    pub fn max_size(&self) -> u64 {
        match self {
            Self::Image => 10 * 1024 * 1024,
            Self::File => 20 * 1024 * 1024,
        }
    }
}

/// Response from `/cgi-bin/media/upload`
#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub media_id: Option<String>,
    pub created_at: Option<String>,
}
