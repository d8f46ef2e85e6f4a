//! Part transfer: bounded request bodies and the per-part PUT.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use reqwest::StatusCode;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf, Take};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use adrive_common::{Error, Result};

use crate::client::Drive;
use crate::upload::PartInfo;

/// Buffer size of a part body stream.
const READ_CHUNK: usize = 64 * 1024;

/// One upload source shared by the bodies of consecutive parts.
///
/// Each part continues where the previous one stopped. The number of bytes
/// handed out so far is tracked across all clones.
pub(crate) struct SharedReader<R> {
    inner: Arc<Mutex<R>>,
    consumed: Arc<AtomicU64>,
}

impl<R> SharedReader<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            inner: Arc::new(Mutex::new(reader)),
            consumed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Total bytes read from the source by every part so far.
    pub(crate) fn consumed(&self) -> u64 {
        self.consumed.load(Ordering::Acquire)
    }
}

impl<R> Clone for SharedReader<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            consumed: self.consumed.clone(),
        }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for SharedReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let mut reader = match self.inner.lock() {
            Ok(guard) => guard,
            Err(_) => {
                return Poll::Ready(Err(io::Error::other("upload source lock poisoned")));
            }
        };

        let poll = Pin::new(&mut *reader).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = poll {
            let read = (buf.filled().len() - before) as u64;
            self.consumed.fetch_add(read, Ordering::AcqRel);
        }
        poll
    }
}

/// Stream exactly the next `limit` bytes of `reader`, or fewer if it ends.
fn part_stream<R>(reader: SharedReader<R>, limit: u64) -> ReaderStream<Take<SharedReader<R>>>
where
    R: AsyncRead + Unpin,
{
    ReaderStream::with_capacity(reader.take(limit), READ_CHUNK)
}

/// Request body carrying at most `limit` bytes of `reader`.
pub(crate) fn bounded_body<R>(reader: SharedReader<R>, limit: u64) -> reqwest::Body
where
    R: AsyncRead + Send + Unpin + 'static,
{
    reqwest::Body::wrap_stream(part_stream(reader, limit))
}

impl Drive {
    /// PUT one part to its pre-signed URL.
    ///
    /// # Errors
    /// - `PartUploadFailed` unless the service answers exactly 200, including
    ///   on transport failure or a read error from the source
    pub async fn upload_part(&self, part: &PartInfo, body: impl Into<reqwest::Body>) -> Result<()> {
        debug!(part = part.part_number, "PUT part");

        let status = self
            .transport
            .put_stream(&part.upload_url, body.into())
            .await
            .map_err(|e| Error::PartUploadFailed {
                part_number: part.part_number,
                reason: e.to_string(),
            })?;

        if status == StatusCode::OK {
            return Ok(());
        }

        warn!(part = part.part_number, status = status.as_u16(), "Part upload rejected");
        Err(Error::PartUploadFailed {
            part_number: part.part_number,
            reason: format!("unexpected status {}", status),
        })
    }
}
