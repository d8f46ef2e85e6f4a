//! Item lookup and content download.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::pin::Pin;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use adrive_common::{Error, Result};

use crate::client::Drive;
use crate::item::RemoteItem;
use crate::ops::{IMAGE_THUMBNAIL_PROCESS, IMAGE_URL_PROCESS, URL_EXPIRE_SEC, VIDEO_THUMBNAIL_PROCESS};

const API_FILE_GET: &str = "/v2/file/get";
const API_GET_DOWNLOAD_URL: &str = "/v2/file/get_download_url";

/// Byte stream type for downloads.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

#[derive(Debug, Deserialize)]
struct DownloadUrlResponse {
    #[serde(default)]
    url: String,
}

impl Drive {
    /// Get metadata of a single item.
    pub async fn get_item(&self, file_id: &str) -> Result<RemoteItem> {
        let grant = self.ensure_valid_token().await?;
        let params = json!({
            "drive_id": grant.drive_id,
            "file_id": file_id,
            "image_thumbnail_process": IMAGE_THUMBNAIL_PROCESS,
            "image_url_process": IMAGE_URL_PROCESS,
            "video_thumbnail_process": VIDEO_THUMBNAIL_PROCESS,
            "url_expire_sec": URL_EXPIRE_SEC,
        });
        self.api_post(API_FILE_GET, &grant, &params).await
    }

    /// Get a short-lived signed URL for the content of `file_id`.
    ///
    /// # Errors
    /// - `DownloadFailed` if the service returns no URL
    pub async fn download_url(&self, file_id: &str) -> Result<String> {
        let grant = self.ensure_valid_token().await?;
        let params = json!({
            "drive_id": grant.drive_id,
            "file_id": file_id,
        });

        let response: DownloadUrlResponse = self
            .api_post(API_GET_DOWNLOAD_URL, &grant, &params)
            .await?;
        if response.url.is_empty() {
            return Err(Error::DownloadFailed(format!("no download URL for {}", file_id)));
        }
        Ok(response.url)
    }

    /// Open the content of a file as a stream.
    ///
    /// # Errors
    /// - `NotAFile` if the item is a folder or of unknown kind
    /// - `DownloadFailed` unless the content fetch answers 200
    pub async fn download(&self, file_id: &str) -> Result<ByteStream> {
        let item = self.get_item(file_id).await?;
        if !item.is_file() {
            return Err(Error::NotAFile(file_id.to_string()));
        }

        let url = match item.download_url.filter(|u| !u.is_empty()) {
            Some(url) => url,
            None => self.download_url(file_id).await?,
        };

        debug!(file_id, "Fetching content");
        let response = self.transport.get(&url).await?;
        if response.status() != StatusCode::OK {
            return Err(Error::DownloadFailed(format!(
                "unexpected status {} for {}",
                response.status(),
                file_id
            )));
        }

        let stream = response
            .bytes_stream()
            .map(|result| result.map_err(|e| Error::Network(format!("Stream read error: {}", e))));

        Ok(Box::pin(stream))
    }

    /// Download a file to `target`, returning the number of bytes written.
    ///
    /// The target is only created once the content fetch has succeeded.
    pub async fn download_to_path(&self, file_id: &str, target: impl AsRef<Path>) -> Result<u64> {
        let mut stream = self.download(file_id).await?;
        let mut file = tokio::fs::File::create(target.as_ref()).await?;

        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        info!(file_id, bytes = written, target = %target.as_ref().display(), "Download complete");
        Ok(written)
    }
}
