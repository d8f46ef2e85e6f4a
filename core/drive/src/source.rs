//! Byte sources accepted by uploads.

use std::io::Cursor;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};

use adrive_common::{Error, FileDescriptor, Result};

/// Anything with a name, a size and sequentially readable bytes.
///
/// Uploads read a source strictly forward, once, in part order.
pub trait UploadSource: AsyncRead + Send + Unpin {
    /// Logical file name on the remote side.
    fn name(&self) -> &str;

    /// Total size in bytes.
    fn size(&self) -> u64;

    /// Precomputed content hash for server-side dedup.
    fn pre_hash(&self) -> Option<&str> {
        None
    }

    /// Build the descriptor sent during proof negotiation.
    fn descriptor(&self) -> Result<FileDescriptor> {
        let descriptor = FileDescriptor::new(self.name(), self.size())?;
        Ok(match self.pre_hash() {
            Some(hash) => descriptor.with_pre_hash(hash),
            None => descriptor,
        })
    }
}

/// A local file opened for upload.
pub struct LocalFile {
    file: File,
    name: String,
    size: u64,
}

impl LocalFile {
    /// Open `path` for upload, using its final component as the remote name.
    ///
    /// # Errors
    /// - The path cannot be opened
    /// - The path is a directory or has no file name
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).await?;
        let meta = file.metadata().await?;

        if meta.is_dir() {
            return Err(Error::InvalidInput(format!(
                "{} is a directory",
                path.display()
            )));
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::InvalidInput(format!("No file name in {}", path.display())))?
            .to_string();

        Ok(Self {
            file,
            name,
            size: meta.len(),
        })
    }
}

impl AsyncRead for LocalFile {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.file).poll_read(cx, buf)
    }
}

impl UploadSource for LocalFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }
}

/// An in-memory buffer uploaded under a given name.
pub struct MemorySource {
    name: String,
    data: Cursor<Bytes>,
    pre_hash: Option<String>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: Cursor::new(data.into()),
            pre_hash: None,
        }
    }

    pub fn with_pre_hash(mut self, pre_hash: impl Into<String>) -> Self {
        self.pre_hash = Some(pre_hash.into());
        self
    }
}

impl AsyncRead for MemorySource {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.data).poll_read(cx, buf)
    }
}

impl UploadSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.data.get_ref().len() as u64
    }

    fn pre_hash(&self) -> Option<&str> {
        self.pre_hash.as_deref()
    }
}
