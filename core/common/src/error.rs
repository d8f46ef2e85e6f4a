//! Common error types for adrive.

use thiserror::Error;

/// Failures of the refresh-token exchange.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The refresh endpoint answered, but a required field was empty or zero.
    #[error("Refresh rejected: response is missing `{missing}`")]
    RefreshRejected { missing: &'static str },

    /// The refresh endpoint answered with a non-success status.
    #[error("Refresh failed with status {status}: {body}")]
    RefreshFailed { status: u16, body: String },

    /// An authenticated request was refused by the service.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

/// Top-level error type for drive operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Token refresh or authorization failed.
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// The create-with-proof response did not describe a usable session.
    #[error("Proof negotiation rejected: {0}")]
    ProofRejected(String),

    /// A single part PUT failed; the whole upload is aborted.
    #[error("Upload of part {part_number} failed: {reason}")]
    PartUploadFailed { part_number: u32, reason: String },

    /// Fetching file content failed.
    #[error("Download failed: {0}")]
    DownloadFailed(String),

    /// The item asked for as a file is something else.
    #[error("Item {0} is not a file")]
    NotAFile(String),

    /// Batch response count does not match the request count.
    #[error("Batch mismatch: requested {requested}, received {received}")]
    BatchMismatch { requested: usize, received: usize },

    /// Trash or delete was not acknowledged.
    #[error("Remove failed: {0}")]
    RemoveFailed(String),

    /// The service answered with an unexpected status or payload.
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// The service answered with a payload that breaks the protocol.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Transport-level failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Access denied by the service.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl Error {
    /// Whether this error came from the token lifecycle.
    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Auth(_))
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
