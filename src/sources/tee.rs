//! Stream capture, tee(1) style

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

use crate::source::ByteSource;
use crate::{Result, TelemetryError};

/// Copies every byte read from `inner` into `sink`
///
/// The capture is best effort: if a write or flush fails, capturing stops
/// with a warning and the stream keeps flowing to the synchronizer. The sink
/// is flushed at end of stream and whenever the reader loop exits. A capture
/// file can later be fed back through [`ReplaySource`](super::ReplaySource).
pub struct TeeSource<S, W: Write> {
    inner: S,
    sink: Option<W>,
    flushed: u64,
    // written since the last successful flush
    pending: u64,
}

impl<S: ByteSource> TeeSource<S, BufWriter<File>> {
    /// Tee `inner` into a newly created capture file at `path`.
    pub fn to_file<P: AsRef<Path>>(inner: S, path: P) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::create(path).map_err(|e| TelemetryError::file_error(path.to_path_buf(), e))?;
        info!(path = %path.display(), source = %inner.describe(), "Capturing raw stream");
        Ok(Self::new(inner, BufWriter::new(file)))
    }
}

impl<S: ByteSource, W: Write + Send + 'static> TeeSource<S, W> {
    pub fn new(inner: S, sink: W) -> Self {
        Self { inner, sink: Some(sink), flushed: 0, pending: 0 }
    }

    /// Bytes handed to the sink so far
    ///
    /// After a sink failure this only counts bytes confirmed by the last
    /// successful flush.
    pub fn captured(&self) -> u64 {
        self.flushed + self.pending
    }

    /// Whether the sink is still accepting bytes.
    pub fn is_capturing(&self) -> bool {
        self.sink.is_some()
    }

    /// Flush and return the sink, plus the wrapped source.
    pub fn into_parts(mut self) -> (S, Option<W>) {
        self.flush();
        (self.inner, self.sink)
    }

    fn capture(&mut self, byte: u8) {
        let Some(sink) = self.sink.as_mut() else { return };
        match sink.write_all(&[byte]) {
            Ok(()) => self.pending += 1,
            Err(e) => self.disable(e),
        }
    }

    fn flush(&mut self) {
        let Some(sink) = self.sink.as_mut() else { return };
        match sink.flush() {
            Ok(()) => {
                self.flushed += self.pending;
                self.pending = 0;
            }
            Err(e) => self.disable(e),
        }
    }

    fn disable(&mut self, e: std::io::Error) {
        warn!("Capture sink failed after {} bytes, capture disabled: {}", self.flushed, e);
        self.sink = None;
        self.pending = 0;
    }
}

#[async_trait::async_trait]
impl<S: ByteSource, W: Write + Send + 'static> ByteSource for TeeSource<S, W> {
    async fn next_byte(&mut self) -> Result<Option<u8>> {
        let next = self.inner.next_byte().await?;
        match next {
            Some(byte) => self.capture(byte),
            None => self.flush(),
        }
        Ok(next)
    }

    fn describe(&self) -> String {
        format!("tee({})", self.inner.describe())
    }

    fn release(&mut self) {
        self.flush();
        self.inner.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ReaderSource;
    use std::io::Cursor;

    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::other("disk full"))
        }
    }

    #[tokio::test]
    async fn copies_what_is_read() {
        let inner = ReaderSource::new(Cursor::new(vec![1u8, 2, 3]));
        let mut tee = TeeSource::new(inner, Vec::new());

        assert_eq!(tee.next_byte().await.unwrap(), Some(1));
        assert_eq!(tee.next_byte().await.unwrap(), Some(2));
        assert_eq!(tee.captured(), 2);
        assert_eq!(tee.next_byte().await.unwrap(), Some(3));
        assert_eq!(tee.next_byte().await.unwrap(), None);

        let (_, sink) = tee.into_parts();
        assert_eq!(sink.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn broken_sink_does_not_stop_the_stream() {
        let inner = ReaderSource::new(Cursor::new(vec![9u8, 8]));
        let mut tee = TeeSource::new(inner, BrokenSink);

        assert_eq!(tee.next_byte().await.unwrap(), Some(9));
        assert!(!tee.is_capturing());
        assert_eq!(tee.next_byte().await.unwrap(), Some(8));
        assert_eq!(tee.captured(), 0);
    }

    #[tokio::test]
    async fn buffered_sink_failure_surfaces_at_end_of_stream() {
        let inner = ReaderSource::new(Cursor::new(vec![1u8, 2, 3]));
        let mut tee = TeeSource::new(inner, BufWriter::new(BrokenSink));

        for expected in [1, 2, 3] {
            assert_eq!(tee.next_byte().await.unwrap(), Some(expected));
        }
        // the buffer has absorbed every write so far
        assert!(tee.is_capturing());
        assert_eq!(tee.captured(), 3);

        assert_eq!(tee.next_byte().await.unwrap(), None);
        assert!(!tee.is_capturing());
        assert_eq!(tee.captured(), 0);
    }

    #[tokio::test]
    async fn release_flushes_mid_stream() {
        let inner = ReaderSource::new(Cursor::new(vec![4u8, 5, 6]));
        let mut tee = TeeSource::new(inner, BufWriter::new(Vec::new()));

        assert_eq!(tee.next_byte().await.unwrap(), Some(4));
        assert_eq!(tee.next_byte().await.unwrap(), Some(5));
        tee.release();
        assert_eq!(tee.captured(), 2);

        let (_, sink) = tee.into_parts();
        assert_eq!(sink.unwrap().get_ref(), &vec![4, 5]);
    }

    #[tokio::test]
    async fn failed_flush_on_release_disables_capture() {
        let inner = ReaderSource::new(Cursor::new(vec![7u8, 8]));
        let mut tee = TeeSource::new(inner, BufWriter::new(BrokenSink));

        assert_eq!(tee.next_byte().await.unwrap(), Some(7));
        tee.release();
        assert!(!tee.is_capturing());
        // the stream itself is unaffected
        assert_eq!(tee.next_byte().await.unwrap(), Some(8));
        assert_eq!(tee.captured(), 0);
    }
}
