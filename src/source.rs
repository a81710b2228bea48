//! Byte source trait for the frame reader

use tokio::io::{AsyncRead, AsyncReadExt, BufReader};

use crate::Result;

/// Sequential octet stream feeding a [`StreamSynchronizer`](crate::StreamSynchronizer)
///
/// Sources hand out one byte at a time and never seek. The synchronizer
/// races every call against its cancellation token, so implementations
/// must be cancel safe: dropping a pending `next_byte` future must not lose
/// a byte that was already taken from the underlying device.
#[async_trait::async_trait]
pub trait ByteSource: Send + 'static {
    /// Get the next byte
    ///
    /// Returns:
    /// - `Ok(Some(byte))` - next octet of the stream
    /// - `Ok(None)` - end of stream (normal termination)
    /// - `Err(e)` - read failed; the caller decides whether to retry
    async fn next_byte(&mut self) -> Result<Option<u8>>;

    /// Short human-readable origin used in logs.
    fn describe(&self) -> String;

    /// Called on the reader thread when the read loop exits, while its
    /// runtime is still alive
    ///
    /// Sources flush buffered output here and drop anything registered with
    /// the runtime, since the next [`start`](crate::BackgroundReader::start)
    /// runs on a fresh one.
    fn release(&mut self) {}
}

#[async_trait::async_trait]
impl ByteSource for Box<dyn ByteSource> {
    async fn next_byte(&mut self) -> Result<Option<u8>> {
        (**self).next_byte().await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Adapts any [`AsyncRead`] (pipe, TTY, socket, in-memory cursor) into a
/// [`ByteSource`].
pub struct ReaderSource<R> {
    reader: BufReader<R>,
    label: String,
}

impl<R: AsyncRead + Unpin + Send + 'static> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self::labelled(reader, "reader")
    }

    pub fn labelled(reader: R, label: impl Into<String>) -> Self {
        Self { reader: BufReader::new(reader), label: label.into() }
    }

    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }
}

#[async_trait::async_trait]
impl<R: AsyncRead + Unpin + Send + 'static> ByteSource for ReaderSource<R> {
    async fn next_byte(&mut self) -> Result<Option<u8>> {
        // read_u8 is cancel safe: a dropped call has not consumed anything
        match self.reader.read_u8().await {
            Ok(byte) => Ok(Some(byte)),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}
