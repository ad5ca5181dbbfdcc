//! Application message sending (`/cgi-bin/message/send`)

use std::path::Path;

use super::client::WeComClient;
use crate::auth::TokenCache;
use crate::error::{Error, Result};
use crate::models::{join_recipients, ApiStatus, MediaKind, Message, SendOptions, SendRequest};

impl<C: TokenCache> WeComClient<C> {
    /// Send a message with the default [`SendOptions`].
    pub async fn send<S: AsRef<str>>(
        &self,
        message: &Message,
        recipients: &[S],
    ) -> Result<serde_json::Value> {
        self.send_with_options(message, recipients, &SendOptions::default())
            .await
    }

    /// Send a message and return the vendor's response body as received.
    pub async fn send_with_options<S: AsRef<str>>(
        &self,
        message: &Message,
        recipients: &[S],
        options: &SendOptions,
    ) -> Result<serde_json::Value> {
        let request = SendRequest {
            touser: join_recipients(recipients)?,
            msgtype: message.msgtype(),
            agentid: &self.credential().agent_id,
            message,
            options,
        };

        tracing::debug!(
            "Sending {} message to {} recipient(s)",
            request.msgtype,
            recipients.len()
        );
        let body: serde_json::Value = self.post_json("message/send", &request).await?;

        let status = ApiStatus::of(&body);
        if !status.is_ok() {
            self.note_status(&status).await;
            return Err(Error::Send {
                code: status.errcode,
                message: status.errmsg,
            });
        }

        // Partial delivery is reported in the body, not as an errcode.
        if let Some(invalid) = body.get("invaliduser").and_then(|v| v.as_str()) {
            if !invalid.is_empty() {
                tracing::warn!("Recipients not delivered: {}", invalid);
            }
        }

        Ok(body)
    }

    pub async fn send_text<S: AsRef<str>>(
        &self,
        content: &str,
        recipients: &[S],
    ) -> Result<serde_json::Value> {
        self.send(&Message::text(content), recipients).await
    }

    pub async fn send_markdown<S: AsRef<str>>(
        &self,
        content: &str,
        recipients: &[S],
    ) -> Result<serde_json::Value> {
        self.send(&Message::markdown(content), recipients).await
    }

    /// Upload a local image and send it.
    pub async fn send_image<S: AsRef<str>>(
        &self,
        path: impl AsRef<Path>,
        recipients: &[S],
    ) -> Result<serde_json::Value> {
        join_recipients(recipients)?;
        let media_id = self.upload_media(path, MediaKind::Image).await?;
        self.send(&Message::image(media_id), recipients).await
    }

    /// Upload a local file and send it.
    pub async fn send_file<S: AsRef<str>>(
        &self,
        path: impl AsRef<Path>,
        recipients: &[S],
    ) -> Result<serde_json::Value> {
        join_recipients(recipients)?;
        let media_id = self.upload_media(path, MediaKind::File).await?;
        self.send(&Message::file(media_id), recipients).await
    }
}
