//! Outgoing message payloads

use serde::{Serialize, Serializer};

use crate::error::{Error, Result};

/// Message body, serialized as `{"<msgtype>": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Message {
    Text { content: String },
    Markdown { content: String },
    Image { media_id: String },
    File { media_id: String },
}

impl Message {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    pub fn markdown(content: impl Into<String>) -> Self {
        Self::Markdown {
            content: content.into(),
        }
    }

    pub fn image(media_id: impl Into<String>) -> Self {
        Self::Image {
            media_id: media_id.into(),
        }
    }

    pub fn file(media_id: impl Into<String>) -> Self {
        Self::File {
            media_id: media_id.into(),
        }
    }

    /// Value of the `msgtype` field.
    pub fn msgtype(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Markdown { .. } => "markdown",
            Self::Image { .. } => "image",
            Self::File { .. } => "file",
        }
    }
}

/// Delivery flags sent with every message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendOptions {
    /// Confidential message (watermarked, no forwarding)
    #[serde(serialize_with = "flag")]
    pub safe: bool,
    /// Translate `$userName=..$` style ids in content
    #[serde(serialize_with = "flag")]
    pub enable_id_trans: bool,
    #[serde(serialize_with = "flag")]
    pub enable_duplicate_check: bool,
    /// Window for duplicate detection, seconds
    pub duplicate_check_interval: u32,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            safe: false,
            enable_id_trans: true,
            enable_duplicate_check: false,
            duplicate_check_interval: 1800,
        }
    }
}

fn flag<S: Serializer>(value: &bool, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*value))
}

/// Body of `POST /cgi-bin/message/send`
#[derive(Debug, Serialize)]
pub(crate) struct SendRequest<'a> {
    pub touser: String,
    pub msgtype: &'static str,
    pub agentid: &'a str,
    #[serde(flatten)]
    pub message: &'a Message,
    #[serde(flatten)]
    pub options: &'a SendOptions,
}

/// Join user ids into the `touser` field, in order.
pub(crate) fn join_recipients<S: AsRef<str>>(users: &[S]) -> Result<String> {
    if users.is_empty() {
        return Err(Error::NoRecipients);
    }
    Ok(users
        .iter()
        .map(|u| u.as_ref())
        .collect::<Vec<_>>()
        .join("|"))
}
