//! Error types returned by the WeCom client

/// Errors produced by [`crate::WeComClient`] and the token caches.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The access token could not be obtained.
    #[error("failed to obtain access token: {0}")]
    Auth(String),

    /// The vendor rejected a message.
    #[error("message rejected (errcode {code}): {message}")]
    Send { code: i64, message: String },

    /// A media file could not be read or uploaded.
    #[error("media upload failed: {0}")]
    Upload(String),

    /// No user is bound to the given mobile number.
    #[error("no user found for mobile {mobile}: {message}")]
    Lookup { mobile: String, message: String },

    #[error("recipient list is empty")]
    NoRecipients,

    /// A pass-through call returned a non-zero errcode.
    #[error("WeCom API error (errcode {code}): {message}")]
    Api { code: i64, message: String },

    #[error("HTTP {status} for {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    #[error("request to {url} failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("token cache: {0}")]
    Cache(String),
}

pub type Result<T> = std::result::Result<T, Error>;
