//! Remote item metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a remote item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    File,
    Folder,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Metadata of a remote file or folder as returned by the service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteItem {
    #[serde(default)]
    pub drive_id: String,
    #[serde(default)]
    pub domain_id: String,
    #[serde(default)]
    pub file_id: String,
    #[serde(default)]
    pub parent_file_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ItemKind,
    /// Size in bytes (absent for folders).
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub content_hash: Option<String>,
    /// Algorithm of `content_hash`, e.g. `sha1`.
    #[serde(default)]
    pub content_hash_name: Option<String>,
    #[serde(default)]
    pub crc64_hash: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_extension: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub encrypt_mode: Option<String>,
    /// Short-lived signed content URL.
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub upload_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RemoteItem {
    pub fn is_file(&self) -> bool {
        self.kind == ItemKind::File
    }

    pub fn is_folder(&self) -> bool {
        self.kind == ItemKind::Folder
    }
}
