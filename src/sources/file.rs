//! Device and file byte sources

use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

use crate::source::{ByteSource, ReaderSource};
use crate::{Result, TelemetryError};

#[cfg(unix)]
pub(crate) use polled::PolledFd;

/// A serial TTY, named pipe or capture file opened by [`open_device`]
///
/// Regular files are read through `tokio::fs`, whose reads always complete.
/// Anything else can stay silent forever, so on Unix it is opened
/// non-blocking and read through the runtime's reactor: cancelling the read
/// loop then abandons nothing in a blocking pool.
pub struct DeviceSource {
    kind: Kind,
    label: String,
}

enum Kind {
    Regular(ReaderSource<tokio::fs::File>),
    #[cfg(unix)]
    Polled(PolledFd),
}

/// Open `path` for sequential reading.
///
/// Works for anything the OS exposes as a readable file: a serial TTY that
/// was configured beforehand (baud rate, raw mode), a named pipe fed by
/// another process, or a capture written by [`TeeSource`](super::TeeSource).
/// A pipe with no writer attached reads as end of stream.
pub fn open_device<P: AsRef<Path>>(path: P) -> Result<DeviceSource> {
    let path = path.as_ref();
    let file = open_read(path).map_err(|e| TelemetryError::file_error(path.to_path_buf(), e))?;
    let regular = file
        .metadata()
        .map_err(|e| TelemetryError::file_error(path.to_path_buf(), e))?
        .is_file();

    let label = path.display().to_string();
    let kind = if regular {
        Kind::Regular(ReaderSource::labelled(tokio::fs::File::from_std(file), label.clone()))
    } else {
        polled_kind(file)
    };

    info!(path = %path.display(), regular, "Opened byte source");
    Ok(DeviceSource { kind, label })
}

#[cfg(unix)]
fn open_read(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    std::fs::OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK | libc::O_NOCTTY)
        .open(path)
}

#[cfg(not(unix))]
fn open_read(path: &Path) -> std::io::Result<File> {
    File::open(path)
}

#[cfg(unix)]
fn polled_kind(file: File) -> Kind {
    Kind::Polled(PolledFd::new(file))
}

#[cfg(not(unix))]
fn polled_kind(file: File) -> Kind {
    Kind::Regular(ReaderSource::new(tokio::fs::File::from_std(file)))
}

#[async_trait::async_trait]
impl ByteSource for DeviceSource {
    async fn next_byte(&mut self) -> Result<Option<u8>> {
        match &mut self.kind {
            Kind::Regular(reader) => reader.next_byte().await,
            #[cfg(unix)]
            Kind::Polled(fd) => Ok(fd.next_byte().await?),
        }
    }

    fn describe(&self) -> String {
        self.label.clone()
    }

    fn release(&mut self) {
        match &mut self.kind {
            Kind::Regular(reader) => reader.release(),
            #[cfg(unix)]
            Kind::Polled(fd) => {
                fd.deregister();
                debug!(source = %self.label, "Device deregistered from reader runtime");
            }
        }
    }
}

#[cfg(unix)]
mod polled {
    use std::fs::File;
    use std::io::{self, Read};

    use tokio::io::unix::AsyncFd;

    const READ_CHUNK: usize = 256;

    /// Non-blocking descriptor registered lazily with the current runtime.
    pub(crate) struct PolledFd {
        file: Option<File>,
        registered: Option<AsyncFd<File>>,
        buf: Box<[u8]>,
        pos: usize,
        len: usize,
    }

    impl PolledFd {
        pub(crate) fn new(file: File) -> Self {
            Self {
                file: Some(file),
                registered: None,
                buf: vec![0; READ_CHUNK].into_boxed_slice(),
                pos: 0,
                len: 0,
            }
        }

        /// Cancel safe: a dropped call leaves buffered bytes in place.
        pub(crate) async fn next_byte(&mut self) -> io::Result<Option<u8>> {
            if self.pos == self.len && self.fill().await? == 0 {
                return Ok(None);
            }
            let byte = self.buf[self.pos];
            self.pos += 1;
            Ok(Some(byte))
        }

        /// Hand the descriptor back from the reactor it was registered with.
        pub(crate) fn deregister(&mut self) {
            if let Some(fd) = self.registered.take() {
                self.file = Some(fd.into_inner());
            }
        }

        fn register(&mut self) -> io::Result<()> {
            if self.registered.is_some() {
                return Ok(());
            }
            let file = self.file.take().ok_or_else(|| io::Error::other("device handle lost"))?;
            match AsyncFd::try_new(file) {
                Ok(fd) => {
                    self.registered = Some(fd);
                    Ok(())
                }
                Err(e) => {
                    let (file, err) = e.into_parts();
                    self.file = Some(file);
                    Err(err)
                }
            }
        }

        async fn fill(&mut self) -> io::Result<usize> {
            self.register()?;
            let Some(fd) = self.registered.as_ref() else {
                return Err(io::Error::other("device not registered"));
            };

            loop {
                let mut guard = fd.readable().await?;
                let read = guard.try_io(|inner| {
                    let mut file = inner.get_ref();
                    file.read(&mut self.buf)
                });
                match read {
                    Ok(Ok(n)) => {
                        self.pos = 0;
                        self.len = n;
                        return Ok(n);
                    }
                    Ok(Err(e)) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Ok(Err(e)) => return Err(e),
                    // readiness was stale; wait for the next edge
                    Err(_would_block) => continue,
                }
            }
        }
    }
}
