//! Client for a cloud drive service.
//!
//! This crate provides:
//! - Refresh-token authentication with in-memory expiry tracking
//! - Chunked uploads negotiated through a proof-of-file handshake
//! - Streamed downloads through signed URLs
//! - Listing, folder creation and (batch) removal
//!
//! # Design Principles
//! - One pooled transport per drive, decorated uniformly
//! - No retries: every failure surfaces to the caller
//! - No persisted state: tokens and upload sessions live in memory only

pub mod auth;
pub mod client;
pub mod config;
pub mod download;
pub mod item;
pub mod ops;
pub mod part;
pub mod source;
pub mod transport;
pub mod upload;

pub use auth::{AccessGrant, Authenticator, Credentials, TokenManager};
pub use client::Drive;
pub use config::{DriveConfig, Endpoints, MAX_PART_SIZE};
pub use download::ByteStream;
pub use item::{ItemKind, RemoteItem};
pub use ops::{ListLimit, ListOptions, ListPage, OrderBy, OrderDirection};
pub use source::{LocalFile, MemorySource, UploadSource};
pub use transport::Transport;
pub use upload::{part_count, part_len, plan_parts, PartInfo, UploadSession};

pub use adrive_common::{AuthError, Error, FileDescriptor, Result, SecretToken};
