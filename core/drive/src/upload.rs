//! Chunked upload: proof negotiation, part transfer and completion.
//!
//! An upload runs three steps against the service:
//! 1. `create_with_proof` registers the file and returns one pre-signed URL
//!    per part
//! 2. each part is streamed to its URL, in ascending part order
//! 3. `complete` finalises the file and returns its metadata
//!
//! Any failure aborts the whole upload. The orphaned remote session is left
//! to the service.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

use adrive_common::{Error, FileDescriptor, Result};

use crate::client::Drive;
use crate::item::RemoteItem;
use crate::part::{bounded_body, SharedReader};
use crate::source::{LocalFile, UploadSource};

const API_CREATE_WITH_PROOF: &str = "/v2/file/create_with_proof";
const API_COMPLETE_UPLOAD: &str = "/v2/file/complete";

/// Name-collision policy: the service renames instead of failing.
const CHECK_NAME_MODE: &str = "auto_rename";

/// One part of an upload and the URL it must be sent to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartInfo {
    pub part_number: u32,
    /// Empty until negotiation fills it in.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub upload_url: String,
}

/// State threaded from negotiation through part uploads to completion.
#[derive(Debug, Clone)]
pub struct UploadSession {
    pub upload_id: String,
    pub file_id: String,
    /// Parts in ascending part number, each with its upload URL.
    pub parts: Vec<PartInfo>,
}

#[derive(Serialize)]
struct FileProof<'a> {
    drive_id: &'a str,
    part_info_list: Vec<PartInfo>,
    parent_file_id: &'a str,
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    check_name_mode: &'static str,
    size: u64,
    pre_hash: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateProofResponse {
    #[serde(default)]
    upload_id: String,
    #[serde(default)]
    file_id: String,
    #[serde(default)]
    part_info_list: Vec<PartInfo>,
}

impl CreateProofResponse {
    /// Validate the answer against the `planned` number of parts.
    ///
    /// The returned part numbers must be exactly `1..=planned`, each with a
    /// URL.
    fn into_session(self, planned: usize) -> Result<UploadSession> {
        if self.file_id.is_empty() {
            return Err(Error::ProofRejected("missing file_id".to_string()));
        }
        if self.upload_id.is_empty() {
            return Err(Error::ProofRejected("missing upload_id".to_string()));
        }
        if self.part_info_list.is_empty() {
            return Err(Error::ProofRejected("empty part_info_list".to_string()));
        }
        if let Some(part) = self.part_info_list.iter().find(|p| p.upload_url.is_empty()) {
            return Err(Error::ProofRejected(format!(
                "part {} has no upload_url",
                part.part_number
            )));
        }

        let mut parts = self.part_info_list;
        if parts.len() != planned {
            return Err(Error::ProofRejected(format!(
                "expected {} parts, got {}",
                planned,
                parts.len()
            )));
        }
        parts.sort_by_key(|p| p.part_number);
        if let Some((expected, part)) = (1u32..)
            .zip(&parts)
            .find(|(expected, part)| part.part_number != *expected)
        {
            return Err(Error::ProofRejected(format!(
                "part {} missing, got part {} in its place",
                expected, part.part_number
            )));
        }

        Ok(UploadSession {
            upload_id: self.upload_id,
            file_id: self.file_id,
            parts,
        })
    }
}

/// Number of parts for a file of `size` bytes.
///
/// An empty file still occupies one part.
pub fn part_count(size: u64, part_size: u64) -> u64 {
    size.div_ceil(part_size).max(1)
}

/// Bytes carried by part `part_number` (1-based) of a `size`-byte file.
pub fn part_len(size: u64, part_size: u64, part_number: u32) -> u64 {
    let start = u64::from(part_number)
        .saturating_sub(1)
        .saturating_mul(part_size);
    size.saturating_sub(start).min(part_size)
}

/// Build the part list for negotiation, numbered from 1 with no URLs.
pub fn plan_parts(size: u64, part_size: u64) -> Result<Vec<PartInfo>> {
    let count = part_count(size, part_size);
    let count = u32::try_from(count)
        .map_err(|_| Error::InvalidInput(format!("{} parts exceed the part limit", count)))?;

    Ok((1..=count)
        .map(|part_number| PartInfo {
            part_number,
            upload_url: String::new(),
        })
        .collect())
}

impl Drive {
    /// Register an upload and obtain one upload URL per part.
    ///
    /// # Postconditions
    /// - The session has non-empty IDs and every part has an upload URL
    ///
    /// # Errors
    /// - `ProofRejected` if the response misses an ID, a part or a URL
    /// - Authentication and network errors
    pub async fn negotiate(
        &self,
        parent_id: &str,
        descriptor: &FileDescriptor,
    ) -> Result<UploadSession> {
        let grant = self.ensure_valid_token().await?;

        let planned = plan_parts(descriptor.size(), self.config.part_size)?;
        let planned_count = planned.len();
        let proof = FileProof {
            drive_id: &grant.drive_id,
            part_info_list: planned,
            parent_file_id: parent_id,
            name: descriptor.name(),
            kind: "file",
            check_name_mode: CHECK_NAME_MODE,
            size: descriptor.size(),
            pre_hash: descriptor.pre_hash().unwrap_or_default(),
        };

        let response: CreateProofResponse = self
            .api_post(API_CREATE_WITH_PROOF, &grant, &proof)
            .await?;

        let session = response.into_session(planned_count).map_err(|e| {
            warn!(name = descriptor.name(), "{}", e);
            e
        })?;
        debug!(
            upload_id = %session.upload_id,
            file_id = %session.file_id,
            parts = session.parts.len(),
            "Upload session negotiated"
        );
        Ok(session)
    }

    /// Signal that every part has been sent and fetch the resulting item.
    ///
    /// The response is decoded as-is; callers needing specific fields must
    /// check them.
    pub async fn complete(&self, session: &UploadSession) -> Result<RemoteItem> {
        let grant = self.ensure_valid_token().await?;
        let body = serde_json::json!({
            "drive_id": grant.drive_id,
            "upload_id": session.upload_id,
            "file_id": session.file_id,
        });
        self.api_post(API_COMPLETE_UPLOAD, &grant, &body).await
    }

    /// Upload `reader` as a new file under `parent_id`.
    ///
    /// Parts are sent sequentially; each reads exactly its share of the
    /// declared size from `reader`, which is consumed strictly forward.
    ///
    /// # Errors
    /// - Any negotiation, part or completion failure; later steps are not
    ///   attempted
    /// - `InvalidInput` if `reader` ends before the declared size; the upload
    ///   is not completed
    pub async fn upload<R>(
        &self,
        parent_id: &str,
        descriptor: &FileDescriptor,
        reader: R,
    ) -> Result<RemoteItem>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        info!(name = descriptor.name(), size = descriptor.size(), "Starting upload");

        let session = self.negotiate(parent_id, descriptor).await?;
        let size = descriptor.size();
        let part_size = self.config.part_size;
        let reader = SharedReader::new(reader);
        let mut expected = 0u64;

        for part in &session.parts {
            let len = part_len(size, part_size, part.part_number);
            debug!(
                part = part.part_number,
                of = session.parts.len(),
                bytes = len,
                "Uploading part"
            );
            self.upload_part(part, bounded_body(reader.clone(), len))
                .await?;

            expected += len;
            if reader.consumed() != expected {
                warn!(part = part.part_number, "Upload source ended early");
                return Err(Error::InvalidInput(format!(
                    "upload source ended after {} of {} bytes",
                    reader.consumed(),
                    size
                )));
            }
        }

        let item = self.complete(&session).await?;
        info!(file_id = %item.file_id, name = %item.name, "Upload complete");
        Ok(item)
    }

    /// Upload anything implementing [`UploadSource`].
    pub async fn upload_source<S>(&self, parent_id: &str, source: S) -> Result<RemoteItem>
    where
        S: UploadSource + 'static,
    {
        let descriptor = source.descriptor()?;
        self.upload(parent_id, &descriptor, source).await
    }

    /// Upload a local file, named after its final path component.
    pub async fn upload_from_path(
        &self,
        parent_id: &str,
        path: impl AsRef<Path>,
    ) -> Result<RemoteItem> {
        let file = LocalFile::open(path).await?;
        self.upload_source(parent_id, file).await
    }
}
