//! Temporary media upload (`/cgi-bin/media/upload`)

use std::path::Path;

use super::client::WeComClient;
use crate::auth::TokenCache;
use crate::error::{Error, Result};
use crate::models::{ApiStatus, MediaKind, UploadResponse, MIN_MEDIA_SIZE};

impl<C: TokenCache> WeComClient<C> {
    /// Upload a local file and return the media id the vendor assigned.
    ///
    /// The file is size-checked from its metadata, then read, before any
    /// request is made.
    /// Media ids expire on the vendor side after three days.
    pub async fn upload_media(&self, path: impl AsRef<Path>, kind: MediaKind) -> Result<String> {
        let path = path.as_ref();
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| Error::Upload(format!("cannot read {}: {}", path.display(), e)))?;
        if !meta.is_file() {
            return Err(Error::Upload(format!("{} is not a regular file", path.display())));
        }

        let size = meta.len();
        if size < MIN_MEDIA_SIZE || size > kind.max_size() {
            return Err(Error::Upload(format!(
                "{} is {} bytes; {} uploads must be {}..={} bytes",
                path.display(),
                size,
                kind.as_str(),
                MIN_MEDIA_SIZE,
                kind.max_size()
            )));
        }

        let data = tokio::fs::read(path)
            .await
            .map_err(|e| Error::Upload(format!("cannot read {}: {}", path.display(), e)))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        tracing::debug!("Uploading {} ({} bytes) as {}", file_name, size, kind.as_str());

        let part = reqwest::multipart::Part::bytes(data)
            .file_name(file_name)
            .mime_str("application/octet-stream")
            .map_err(|e| Error::Upload(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("media", part);

        let resp: UploadResponse = self
            .post_multipart("media/upload", &[("type", kind.as_str())], form)
            .await?;

        if resp.errcode != 0 {
            let status = ApiStatus {
                errcode: resp.errcode,
                errmsg: resp.errmsg.clone(),
            };
            self.note_status(&status).await;
            return Err(Error::Upload(format!(
                "errcode {}: {}",
                resp.errcode, resp.errmsg
            )));
        }

        let media_id = resp
            .media_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::Upload("response missing 'media_id'".to_string()))?;

        tracing::debug!(
            "Uploaded {} -> {} (type {:?}, created_at {:?})",
            path.display(),
            media_id,
            resp.media_type,
            resp.created_at
        );
        Ok(media_id)
    }
}
