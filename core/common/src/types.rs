//! Common types used throughout adrive.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Description of a file about to be uploaded.
///
/// Immutable once constructed; one descriptor is supplied per upload call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    name: String,
    size: u64,
    pre_hash: Option<String>,
}

impl FileDescriptor {
    /// Create a descriptor for a file of `size` bytes.
    ///
    /// # Preconditions
    /// - `name` must be non-empty
    /// - `name` must not contain path separators
    ///
    /// # Errors
    /// - Returns `InvalidInput` if the name is unusable
    pub fn new(name: impl Into<String>, size: u64) -> crate::Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(crate::Error::InvalidInput(
                "File name cannot be empty".to_string(),
            ));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(crate::Error::InvalidInput(
                "File name cannot contain separators".to_string(),
            ));
        }
        Ok(Self {
            name,
            size,
            pre_hash: None,
        })
    }

    /// Attach a precomputed content hash used for server-side dedup.
    pub fn with_pre_hash(mut self, pre_hash: impl Into<String>) -> Self {
        let pre_hash = pre_hash.into();
        self.pre_hash = (!pre_hash.is_empty()).then_some(pre_hash);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn pre_hash(&self) -> Option<&str> {
        self.pre_hash.as_deref()
    }
}

/// Bearer or refresh token that zeroizes on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretToken(String);

impl SecretToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Get the raw token for placing on the wire.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretToken([REDACTED; {} chars])", self.0.len())
    }
}
