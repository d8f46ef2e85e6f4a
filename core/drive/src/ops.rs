//! Listing, folder creation and removal.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use tracing::{debug, info};

use adrive_common::{Error, Result};

use crate::client::Drive;
use crate::item::{ItemKind, RemoteItem};

const API_LIST: &str = "/v2/file/list";
const API_CREATE_WITH_FOLDERS: &str = "/adrive/v2/file/createWithFolders";
const API_TRASH: &str = "/v2/recyclebin/trash";
const API_DELETE: &str = "/v3/file/delete";
const API_BATCH: &str = "/v2/batch";

/// Sub-request paths inside a batch call.
const BATCH_TRASH: &str = "/recyclebin/trash";
const BATCH_DELETE: &str = "/file/delete";

/// Page size sent with `all: true`.
const UNLIMITED_PAGE_LIMIT: u64 = 9_999_999_999;

pub(crate) const IMAGE_THUMBNAIL_PROCESS: &str = "image/resize,w_400/format,jpeg";
pub(crate) const IMAGE_URL_PROCESS: &str = "image/resize,w_1920/format,jpeg";
pub(crate) const VIDEO_THUMBNAIL_PROCESS: &str = "video/snapshot,t_0,f_jpg,ar_auto,w_300";
pub(crate) const URL_EXPIRE_SEC: u64 = 1600;

/// How many items a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListLimit {
    /// Follow markers until the folder is exhausted.
    #[default]
    Unlimited,
    /// Return a single page of at most this many items.
    Limited(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderBy {
    #[default]
    Name,
    CreatedAt,
    UpdatedAt,
    Size,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum OrderDirection {
    #[serde(rename = "ASC")]
    Asc,
    #[default]
    #[serde(rename = "DESC")]
    Desc,
}

/// Optional listing parameters.
///
/// Defaults: unlimited, ordered by name, descending.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
    pub limit: ListLimit,
    pub order_by: OrderBy,
    pub order_direction: OrderDirection,
}

impl ListOptions {
    pub fn with_limit(mut self, limit: ListLimit) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn with_order_direction(mut self, direction: OrderDirection) -> Self {
        self.order_direction = direction;
        self
    }
}

/// One page of a listing, or all pages of an unlimited one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListPage {
    #[serde(default)]
    pub items: Vec<RemoteItem>,
    /// Opaque cursor for the next page; empty when there is none.
    #[serde(default)]
    pub next_marker: String,
}

#[derive(Debug, Deserialize)]
struct CreatedFolder {
    #[serde(default)]
    domain_id: String,
    #[serde(default)]
    drive_id: String,
    #[serde(default)]
    file_id: String,
    #[serde(default)]
    parent_file_id: String,
    #[serde(rename = "file_name", default)]
    name: String,
    #[serde(rename = "type", default)]
    kind: ItemKind,
    #[serde(default)]
    encrypt_mode: Option<String>,
}

impl From<CreatedFolder> for RemoteItem {
    fn from(folder: CreatedFolder) -> Self {
        RemoteItem {
            domain_id: folder.domain_id,
            drive_id: folder.drive_id,
            file_id: folder.file_id,
            parent_file_id: folder.parent_file_id,
            name: folder.name,
            kind: folder.kind,
            encrypt_mode: folder.encrypt_mode,
            ..RemoteItem::default()
        }
    }
}

/// Acknowledgement of a trash or delete request.
#[derive(Debug, Default, Deserialize)]
struct RemoveAck {
    #[serde(default)]
    async_task_id: String,
    #[serde(default)]
    file_id: String,
}

impl RemoveAck {
    fn is_acknowledged(&self) -> bool {
        !self.async_task_id.is_empty() && !self.file_id.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    #[serde(default)]
    responses: Vec<BatchEntry>,
}

#[derive(Debug, Deserialize)]
struct BatchEntry {
    #[serde(default)]
    id: String,
    #[serde(default)]
    status: u16,
    #[serde(default)]
    body: RemoveAck,
}

/// Pair each requested ID with its batch entry, in request order.
///
/// Entries are matched by sub-request ID; an entry without one is taken by
/// position.
fn batch_verdicts(ids: &[String], entries: Vec<BatchEntry>) -> Vec<Result<()>> {
    let mut entries: Vec<Option<BatchEntry>> = entries.into_iter().map(Some).collect();

    ids.iter()
        .enumerate()
        .map(|(index, id)| {
            let by_id = entries
                .iter()
                .position(|e| e.as_ref().is_some_and(|e| e.id == *id));
            let by_position = entries
                .get(index)
                .and_then(|e| e.as_ref())
                .filter(|e| e.id.is_empty())
                .map(|_| index);

            match by_id.or(by_position).and_then(|i| entries[i].take()) {
                Some(entry) if entry.body.is_acknowledged() => Ok(()),
                Some(entry) => Err(Error::RemoveFailed(format!(
                    "{} not acknowledged (status {})",
                    id, entry.status
                ))),
                None => Err(Error::RemoveFailed(format!("no batch response for {}", id))),
            }
        })
        .collect()
}

impl Drive {
    /// List the children of `parent_id` (the root when empty).
    ///
    /// With [`ListLimit::Unlimited`] the pages are followed until the service
    /// returns an empty marker and all items come back in arrival order.
    /// With a limit, the single page is returned with its marker.
    ///
    /// # Errors
    /// - `Protocol` if the service hands out any marker a second time
    /// - Authentication and network errors
    pub async fn list_items(
        &self,
        parent_id: &str,
        marker: Option<&str>,
        options: &ListOptions,
    ) -> Result<ListPage> {
        let parent_id = if parent_id.is_empty() {
            self.config.root_id.as_str()
        } else {
            parent_id
        };

        let mut params = json!({
            "parent_file_id": parent_id,
            "order_by": options.order_by,
            "order_direction": options.order_direction,
            "fields": "*",
            "image_thumbnail_process": IMAGE_THUMBNAIL_PROCESS,
            "image_url_process": IMAGE_URL_PROCESS,
            "video_thumbnail_process": VIDEO_THUMBNAIL_PROCESS,
            "url_expire_sec": URL_EXPIRE_SEC,
        });
        match options.limit {
            ListLimit::Unlimited => {
                params["all"] = json!(true);
                params["limit"] = json!(UNLIMITED_PAGE_LIMIT);
            }
            ListLimit::Limited(limit) => {
                params["all"] = json!(false);
                params["limit"] = json!(limit);
            }
        }

        let mut marker = marker.filter(|m| !m.is_empty()).map(str::to_string);
        let mut seen: HashSet<String> = marker.iter().cloned().collect();
        let mut listing = ListPage::default();

        loop {
            let grant = self.ensure_valid_token().await?;
            params["drive_id"] = json!(grant.drive_id);
            if let Some(m) = &marker {
                params["marker"] = json!(m);
            }

            let page: ListPage = self.api_post(API_LIST, &grant, &params).await?;
            debug!(parent_id, items = page.items.len(), "Listed page");

            if let ListLimit::Limited(_) = options.limit {
                return Ok(page);
            }

            listing.items.extend(page.items);
            if page.next_marker.is_empty() {
                break;
            }
            if !seen.insert(page.next_marker.clone()) {
                return Err(Error::Protocol(format!(
                    "listing marker {} repeated",
                    page.next_marker
                )));
            }
            marker = Some(page.next_marker);
        }

        Ok(listing)
    }

    /// Create a folder named `name` under `parent_id`.
    ///
    /// On a name clash the service picks a new name.
    pub async fn mkdir(&self, parent_id: &str, name: &str) -> Result<RemoteItem> {
        let grant = self.ensure_valid_token().await?;
        let params = json!({
            "check_name_mode": "auto_rename",
            "type": "folder",
            "drive_id": grant.drive_id,
            "name": name,
            "parent_file_id": parent_id,
        });

        let folder: CreatedFolder = self
            .api_post(API_CREATE_WITH_FOLDERS, &grant, &params)
            .await?;
        Ok(folder.into())
    }

    /// Move an item to the trash, or delete it for good when `force` is set.
    ///
    /// # Errors
    /// - `RemoveFailed` if the service does not acknowledge the request
    pub async fn remove(&self, file_id: &str, force: bool) -> Result<()> {
        let grant = self.ensure_valid_token().await?;
        let api = if force { API_DELETE } else { API_TRASH };
        let params = json!({
            "drive_id": grant.drive_id,
            "file_id": file_id,
        });

        let ack: RemoveAck = self.api_post(api, &grant, &params).await?;
        if !ack.is_acknowledged() {
            return Err(Error::RemoveFailed(file_id.to_string()));
        }

        info!(file_id, force, "Removed item");
        Ok(())
    }

    /// Remove several items in one request.
    ///
    /// Returns one verdict per input ID, in input order.
    ///
    /// # Errors
    /// - `BatchMismatch` if the service answers a different number of
    ///   sub-requests than were sent
    pub async fn batch_remove(&self, file_ids: &[String], force: bool) -> Result<Vec<Result<()>>> {
        if file_ids.is_empty() {
            return Ok(Vec::new());
        }

        let grant = self.ensure_valid_token().await?;
        let api = if force { BATCH_DELETE } else { BATCH_TRASH };
        let requests: Vec<Value> = file_ids
            .iter()
            .map(|file_id| {
                json!({
                    "url": api,
                    "method": "POST",
                    "id": file_id,
                    "header": { "Content-Type": "application/json" },
                    "body": { "drive_id": grant.drive_id, "file_id": file_id },
                })
            })
            .collect();
        let params = json!({
            "requests": requests,
            "resource": "file",
        });

        let response: BatchResponse = self.api_post(API_BATCH, &grant, &params).await?;
        if response.responses.len() != file_ids.len() {
            return Err(Error::BatchMismatch {
                requested: file_ids.len(),
                received: response.responses.len(),
            });
        }

        let verdicts = batch_verdicts(file_ids, response.responses);
        info!(
            requested = file_ids.len(),
            failed = verdicts.iter().filter(|v| v.is_err()).count(),
            force,
            "Batch remove finished"
        );
        Ok(verdicts)
    }
}
