//! Common utilities and types shared across the adrive crates.
//!
//! This module provides the error taxonomy used by every drive operation
//! and the small value types that cross crate boundaries.

pub mod error;
pub mod types;

pub use error::{AuthError, Error, Result};
pub use types::{FileDescriptor, SecretToken};
