//! File handle seam for the bridge.
//!
//! The bridge only needs three things from its handles: sequential reads
//! from the source, whole-buffer writes to the sink and a close that reports
//! its outcome. [`HandleOpener`] produces both handles; [`FsOpener`] is the
//! `tokio::fs` implementation used outside of tests.

use std::io;
use std::path::Path;

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Read-only handle to the data source.
#[allow(async_fn_in_trait)]
pub trait SourceHandle: Sized {
    /// Read once from the current offset. `Ok(0)` means end of file.
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Release the handle.
    async fn close(self) -> io::Result<()>;
}

/// Write-only handle to the data sink.
#[allow(async_fn_in_trait)]
pub trait SinkHandle: Sized {
    /// Write the whole buffer and wait until the write has completed.
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Release the handle.
    async fn close(self) -> io::Result<()>;
}

/// Opens the two handles of a bridge.
#[allow(async_fn_in_trait)]
pub trait HandleOpener {
    type Source: SourceHandle;
    type Sink: SinkHandle;

    /// Open `path` for reading.
    async fn open_source(&self, path: &Path) -> io::Result<Self::Source>;

    /// Open `path` for writing, creating or truncating it.
    async fn open_sink(&self, path: &Path) -> io::Result<Self::Sink>;
}

/// Opens real files through `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsOpener;

impl HandleOpener for FsOpener {
    type Source = FsSource;
    type Sink = FsSink;

    async fn open_source(&self, path: &Path) -> io::Result<FsSource> {
        File::open(path).await.map(FsSource)
    }

    async fn open_sink(&self, path: &Path) -> io::Result<FsSink> {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .await
            .map(FsSink)
    }
}

/// Source backed by a `tokio::fs::File`.
#[derive(Debug)]
pub struct FsSource(File);

impl SourceHandle for FsSource {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf).await
    }

    async fn close(self) -> io::Result<()> {
        // into_std waits for any operation still running on the blocking pool
        close_file(self.0.into_std().await)
    }
}

/// Sink backed by a `tokio::fs::File`.
#[derive(Debug)]
pub struct FsSink(File);

impl SinkHandle for FsSink {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.0.write_all(data).await?;
        // tokio::fs::File completes writes in the background; flush surfaces
        // the outcome of this write instead of the next one.
        self.0.flush().await
    }

    async fn close(mut self) -> io::Result<()> {
        self.0.flush().await?;
        match self.0.sync_all().await {
            // character devices and pipes cannot be synced
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
            other => other?,
        }
        close_file(self.0.into_std().await)
    }
}

/// Close the descriptor and report what the OS returned. Dropping a `File`
/// discards that result.
#[cfg(unix)]
fn close_file(file: std::fs::File) -> io::Result<()> {
    nix::unistd::close(file).map_err(io::Error::from)
}

#[cfg(not(unix))]
fn close_file(file: std::fs::File) -> io::Result<()> {
    drop(file);
    Ok(())
}

/// Lifecycle slot of one handle: never opened, open, or closed for good.
#[derive(Debug)]
pub(crate) enum HandleSlot<H> {
    Unopened,
    Open(H),
    Closed,
}

impl<H> HandleSlot<H> {
    pub(crate) fn is_closed(&self) -> bool {
        matches!(self, HandleSlot::Closed)
    }

    pub(crate) fn as_open_mut(&mut self) -> Option<&mut H> {
        match self {
            HandleSlot::Open(handle) => Some(handle),
            _ => None,
        }
    }

    /// Mark the slot closed, returning the handle if one was open.
    pub(crate) fn take(&mut self) -> Option<H> {
        match std::mem::replace(self, HandleSlot::Closed) {
            HandleSlot::Open(handle) => Some(handle),
            _ => None,
        }
    }
}
