//! Buffered duplex file bridge.
//!
//! A [`Bridge`] couples a source file and a sink file behind one object: a
//! reader pulls sequential chunks from the source while a writer pushes
//! chunks that are accumulated and flushed to the sink in threshold-sized
//! bursts.
//!
//! # Lifecycle
//!
//! ```text
//! Unopened --open--> Open --teardown/destroy--> Destroying --> Destroyed
//!     \--open fails--> Failed
//! ```
//!
//! - `open` opens the source first and the sink second. Both must succeed.
//! - `finalize` writes what is still buffered once the writer is done.
//! - `teardown` closes the sink and then the source, always attempting both.
//! - A failed read or a failed final flush runs teardown immediately.
//!
//! Every operation takes `&mut self`, so a flush can never be re-entered and
//! at most one operation is in flight per handle. [`Bridge::split`] hands out
//! the two sides separately so a reader and a writer can be driven
//! concurrently.

mod event;
mod handle;
mod read_side;
mod write_side;

pub use event::BridgeEvent;
pub use handle::{FsOpener, FsSink, FsSource, HandleOpener, SinkHandle, SourceHandle};
pub use read_side::{MAX_READ_REQUEST, ReadSide};
pub use write_side::WriteSide;

use bytes::Bytes;
use futures::Stream;
use log::{debug, info, warn};
use tokio::sync::broadcast;

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult, CloseError, ConfigError, OpenError, WriteError};
use event::EventSender;
use handle::HandleSlot;

/// Lifecycle state of a [`Bridge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Constructed, holding configuration only.
    Unopened,
    /// Both handles open.
    Open,
    /// `open` failed; the bridge must not be used.
    Failed,
    /// Teardown in progress.
    Destroying,
    /// Both handles closed. Terminal.
    Destroyed,
}

/// Duplex bridge over a source file and a sink file.
pub struct Bridge<O: HandleOpener = FsOpener> {
    config: BridgeConfig,
    opener: O,
    state: BridgeState,
    read: ReadSide<O::Source>,
    write: WriteSide<O::Sink>,
    events: EventSender,
}

impl Bridge<FsOpener> {
    /// Create an unopened bridge over real files.
    pub fn new(config: BridgeConfig) -> Result<Self, ConfigError> {
        Self::with_opener(config, FsOpener)
    }
}

impl<O: HandleOpener> Bridge<O> {
    /// Create an unopened bridge whose handles come from `opener`.
    pub fn with_opener(config: BridgeConfig, opener: O) -> Result<Self, ConfigError> {
        config.validate()?;
        let events = EventSender::new();
        Ok(Self {
            read: ReadSide::new(config.readable_high_water_mark, events.clone()),
            write: WriteSide::new(config.writable_high_water_mark, events.clone()),
            config,
            opener,
            state: BridgeState::Unopened,
            events,
        })
    }

    /// Open the source for reading, then the sink for writing.
    ///
    /// If the source cannot be opened the sink is never attempted. If the
    /// sink cannot be opened the already opened source is closed before the
    /// error is returned. Either way the bridge moves to
    /// [`BridgeState::Failed`].
    pub async fn open(&mut self) -> BridgeResult<()> {
        match self.state {
            BridgeState::Unopened => {}
            BridgeState::Open => return Ok(()),
            BridgeState::Failed => return Err(BridgeError::NotOpen),
            BridgeState::Destroying | BridgeState::Destroyed => {
                return Err(BridgeError::UseAfterClose);
            }
        }

        let read_path = &self.config.read_file_name;
        let write_path = &self.config.write_file_name;

        let source = match self.opener.open_source(read_path).await {
            Ok(source) => source,
            Err(cause) => {
                let err = OpenError::ReadOpenFailed {
                    path: read_path.clone(),
                    source: cause,
                };
                return Err(self.open_failed(err));
            }
        };

        let sink = match self.opener.open_sink(write_path).await {
            Ok(sink) => sink,
            Err(cause) => {
                let err = OpenError::WriteOpenFailed {
                    path: write_path.clone(),
                    source: cause,
                };
                if let Err(e) = source.close().await {
                    warn!(
                        target: "duplex_bridge::lifecycle",
                        "Failed to close source after sink open failure: {}",
                        e
                    );
                }
                self.read.handle = HandleSlot::Closed;
                return Err(self.open_failed(err));
            }
        };

        self.read.handle = HandleSlot::Open(source);
        self.write.handle = HandleSlot::Open(sink);
        self.state = BridgeState::Open;
        info!(
            target: "duplex_bridge::lifecycle",
            "Opened {} -> {}",
            read_path.display(),
            write_path.display()
        );
        self.events.emit(BridgeEvent::Opened);
        Ok(())
    }

    /// Buffer a chunk on the write side. See [`WriteSide::accept_write`].
    ///
    /// Returns `Ok(true)` whenever the chunk was accepted; it never returns
    /// `Ok(false)`. Back-pressure comes from awaiting the call, which
    /// includes any flush it triggers.
    pub async fn accept_write(&mut self, chunk: impl Into<Bytes>) -> BridgeResult<bool> {
        self.ensure_open()?;
        self.write.accept_write(chunk).await
    }

    /// Retry writing whatever is pending. See [`WriteSide::flush`].
    pub async fn flush(&mut self) -> BridgeResult<()> {
        self.ensure_open()?;
        self.write.flush().await
    }

    /// Pull one chunk from the source. See [`ReadSide::produce_read`].
    ///
    /// A failed read tears the bridge down before the error is returned.
    /// This includes a read side that already failed through
    /// [`split`](Self::split) without the bridge being destroyed.
    pub async fn produce_read(&mut self, requested_size: usize) -> BridgeResult<Option<Bytes>> {
        self.ensure_open()?;
        match self.read.produce_read(requested_size).await {
            Err(err @ BridgeError::Read(_)) => Err(self.fail(err).await),
            other => other,
        }
    }

    /// Pull one chunk sized by the readable high-water mark.
    pub async fn read_chunk(&mut self) -> BridgeResult<Option<Bytes>> {
        self.produce_read(self.config.readable_high_water_mark).await
    }

    /// The source as a lazy, finite stream of chunks of at most
    /// `requested_size` bytes.
    ///
    /// The stream ends at end of file and yields at most one error, after
    /// which it ends as well. It cannot be restarted: a new stream over the
    /// same bridge continues from the current offset.
    pub fn chunks(
        &mut self,
        requested_size: usize,
    ) -> impl Stream<Item = BridgeResult<Bytes>> + '_ {
        futures::stream::unfold(Some(self), move |bridge| async move {
            let Some(bridge) = bridge else {
                return None;
            };
            match bridge.produce_read(requested_size).await {
                Ok(Some(chunk)) => Some((Ok(chunk), Some(bridge))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    /// Flush the remaining buffered bytes once the writer is done.
    ///
    /// A failed final flush is terminal: the bridge is torn down and the
    /// merged error is returned. The same holds when an earlier flush was
    /// interrupted, since the sink contents are then unknown.
    pub async fn finalize(&mut self) -> BridgeResult<()> {
        self.ensure_open()?;
        match self.write.finalize().await {
            Err(
                err @ (BridgeError::Flush(_) | BridgeError::Write(WriteError::FlushInterrupted)),
            ) => Err(self.fail(err).await),
            other => other,
        }
    }

    /// Close both handles.
    ///
    /// The sink is closed first, then the source; a failure on one never
    /// skips the other. Bytes that were buffered but never finalized are
    /// discarded with a warning.
    pub async fn teardown(&mut self) -> BridgeResult<()> {
        if matches!(
            self.state,
            BridgeState::Destroying | BridgeState::Destroyed
        ) {
            return Err(BridgeError::UseAfterClose);
        }
        match self.close_handles().await {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Tear the bridge down because of `cause`, or on request when `None`.
    ///
    /// When both handles close cleanly the cause is returned unchanged. A
    /// close failure takes precedence; the cause is then still logged and
    /// published as a [`BridgeEvent::Error`].
    pub async fn destroy(&mut self, cause: Option<BridgeError>) -> BridgeResult<()> {
        match cause {
            None => self.teardown().await,
            Some(_) if self.state == BridgeState::Destroyed => Err(BridgeError::UseAfterClose),
            Some(cause) => Err(self.fail(cause).await),
        }
    }

    /// Borrow the read and write sides separately so they can be driven
    /// concurrently.
    ///
    /// The sides do not tear the bridge down on their own: after a read
    /// error or a failed final flush obtained through them, call
    /// [`destroy`](Self::destroy).
    pub fn split(
        &mut self,
    ) -> BridgeResult<(&mut ReadSide<O::Source>, &mut WriteSide<O::Sink>)> {
        self.ensure_open()?;
        Ok((&mut self.read, &mut self.write))
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn pending_size(&self) -> usize {
        self.write.pending_size()
    }

    pub fn pending_chunks(&self) -> usize {
        self.write.pending_chunks()
    }

    pub fn bytes_read(&self) -> u64 {
        self.read.bytes_read()
    }

    pub fn bytes_written(&self) -> u64 {
        self.write.bytes_written()
    }

    pub fn flush_count(&self) -> usize {
        self.write.flush_count()
    }

    /// Whether the source handle has been closed.
    pub fn is_read_closed(&self) -> bool {
        self.read.handle.is_closed()
    }

    /// Whether the sink handle has been closed.
    pub fn is_write_closed(&self) -> bool {
        self.write.handle.is_closed()
    }

    fn ensure_open(&self) -> BridgeResult<()> {
        match self.state {
            BridgeState::Open => Ok(()),
            BridgeState::Unopened | BridgeState::Failed => Err(BridgeError::NotOpen),
            BridgeState::Destroying | BridgeState::Destroyed => Err(BridgeError::UseAfterClose),
        }
    }

    fn open_failed(&mut self, err: OpenError) -> BridgeError {
        warn!(target: "duplex_bridge::lifecycle", "{}", err);
        self.state = BridgeState::Failed;
        self.events.emit(BridgeEvent::Error(err.to_string()));
        err.into()
    }

    /// Run teardown on behalf of `cause` and return the error to report.
    async fn fail(&mut self, cause: BridgeError) -> BridgeError {
        warn!(
            target: "duplex_bridge::lifecycle",
            "Destroying bridge: {}",
            cause
        );
        self.events.emit(BridgeEvent::Error(cause.to_string()));

        match self.close_handles().await {
            None => cause,
            Some(close) => {
                warn!(
                    target: "duplex_bridge::lifecycle",
                    "Close failed while destroying, reporting it over the cause: {}",
                    close
                );
                close.into()
            }
        }
    }

    /// Close the sink, then the source, and move to `Destroyed`.
    async fn close_handles(&mut self) -> Option<CloseError> {
        self.state = BridgeState::Destroying;

        let dropped = self.write.discard_pending();
        if dropped > 0 {
            warn!(
                target: "duplex_bridge::lifecycle",
                "Discarding {} unflushed bytes at teardown",
                dropped
            );
        }

        let write_result = match self.write.handle.take() {
            Some(sink) => sink.close().await,
            None => Ok(()),
        };
        let read_result = match self.read.handle.take() {
            Some(source) => source.close().await,
            None => Ok(()),
        };

        self.state = BridgeState::Destroyed;
        let merged = CloseError::merge(write_result, read_result);
        match &merged {
            Some(err) => {
                warn!(target: "duplex_bridge::lifecycle", "{}", err);
                self.events.emit(BridgeEvent::Error(err.to_string()));
            }
            None => debug!(target: "duplex_bridge::lifecycle", "Both handles closed"),
        }
        self.events.emit(BridgeEvent::Closed);
        merged
    }
}
