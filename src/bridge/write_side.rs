//! Write side of the bridge: accumulates chunks and flushes them to the
//! sink in threshold-sized bursts.
//!
//! Chunks are appended to `pending` in arrival order. Once the pending byte
//! count exceeds the threshold, everything pending is concatenated and
//! written in a single operation. The buffer is cleared only after that
//! write succeeds, so a failed flush never loses data.

use std::io;

use bytes::{Bytes, BytesMut};
use log::{debug, warn};

use super::event::{BridgeEvent, EventSender};
use super::handle::{HandleSlot, SinkHandle};
use crate::error::{BridgeError, BridgeResult, FlushError, WriteError};

/// Owns the sink handle and the pending write buffer.
pub struct WriteSide<K> {
    pub(crate) handle: HandleSlot<K>,
    threshold: usize,
    pending: Vec<Bytes>,
    /// Always the sum of the lengths in `pending`.
    pending_size: usize,
    finished: bool,
    /// Set while a flush is awaiting the sink. Still set on entry means the
    /// previous flush future was dropped mid-write.
    flushing: bool,
    bytes_written: u64,
    flush_count: usize,
    events: EventSender,
}

impl<K: SinkHandle> WriteSide<K> {
    pub(crate) fn new(threshold: usize, events: EventSender) -> Self {
        Self {
            handle: HandleSlot::Unopened,
            threshold,
            pending: Vec::new(),
            pending_size: 0,
            finished: false,
            flushing: false,
            bytes_written: 0,
            flush_count: 0,
            events,
        }
    }

    /// Buffer `chunk`, flushing everything pending once the threshold is
    /// exceeded.
    ///
    /// Always returns `true` on success. The flush, when one happens, is
    /// awaited inside this call, which is where a writer outrunning the sink
    /// is held back.
    ///
    /// On [`WriteError::FlushFailed`] the chunk stays buffered; call
    /// [`flush`](Self::flush) to retry.
    pub async fn accept_write(&mut self, chunk: impl Into<Bytes>) -> BridgeResult<bool> {
        self.ensure_writable()?;

        let chunk = chunk.into();
        self.pending_size += chunk.len();
        self.pending.push(chunk);

        if self.pending_size > self.threshold {
            debug!(
                target: "duplex_bridge::write",
                "Pending {} bytes exceed threshold {}, flushing",
                self.pending_size,
                self.threshold
            );
            self.flush_pending()
                .await
                .map_err(|source| self.flush_failed(source))?;
        }

        Ok(true)
    }

    /// Flush whatever is pending regardless of the threshold.
    pub async fn flush(&mut self) -> BridgeResult<()> {
        self.ensure_handle()?;
        if self.flushing {
            return Err(WriteError::FlushInterrupted.into());
        }
        self.flush_pending()
            .await
            .map_err(|source| self.flush_failed(source))?;
        Ok(())
    }

    /// Write the remaining bytes, even below the threshold, and close the
    /// write side to further chunks. An empty buffer issues no write.
    pub async fn finalize(&mut self) -> BridgeResult<()> {
        self.ensure_handle()?;
        if self.finished {
            debug!(target: "duplex_bridge::write", "finalize called again, ignoring");
            return Ok(());
        }
        if self.flushing {
            return Err(WriteError::FlushInterrupted.into());
        }

        let pending = self.pending_size;
        self.flush_pending()
            .await
            .map_err(|source| FlushError::Failed { pending, source })?;

        self.finished = true;
        self.events.emit(BridgeEvent::Finished);
        Ok(())
    }

    /// Bytes accepted but not yet written.
    pub fn pending_size(&self) -> usize {
        self.pending_size
    }

    /// Number of chunks accepted but not yet written.
    pub fn pending_chunks(&self) -> usize {
        self.pending.len()
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Completed flushes, including the final one.
    pub fn flush_count(&self) -> usize {
        self.flush_count
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn ensure_handle(&self) -> BridgeResult<()> {
        match self.handle {
            HandleSlot::Open(_) => Ok(()),
            HandleSlot::Unopened => Err(BridgeError::NotOpen),
            HandleSlot::Closed => Err(BridgeError::UseAfterClose),
        }
    }

    fn ensure_writable(&self) -> BridgeResult<()> {
        self.ensure_handle()?;
        if self.finished {
            return Err(WriteError::WriteAfterFinalize.into());
        }
        if self.flushing {
            return Err(WriteError::FlushInterrupted.into());
        }
        Ok(())
    }

    fn flush_failed(&self, source: io::Error) -> BridgeError {
        warn!(
            target: "duplex_bridge::write",
            "Flush of {} pending bytes failed: {}",
            self.pending_size,
            source
        );
        WriteError::FlushFailed {
            pending: self.pending_size,
            source,
        }
        .into()
    }

    /// Concatenate `pending` and write it in one operation, clearing the
    /// buffer only on success.
    async fn flush_pending(&mut self) -> io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let Some(sink) = self.handle.as_open_mut() else {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "write handle is not open",
            ));
        };

        let mut data = BytesMut::with_capacity(self.pending_size);
        for chunk in &self.pending {
            data.extend_from_slice(chunk);
        }

        self.flushing = true;
        let result = sink.write_all(&data).await;
        self.flushing = false;
        result?;

        let bytes = data.len();
        self.pending.clear();
        self.pending_size = 0;
        self.bytes_written += bytes as u64;
        self.flush_count += 1;
        debug!(target: "duplex_bridge::write", "Flushed {} bytes", bytes);
        self.events.emit(BridgeEvent::Flushed { bytes });
        Ok(())
    }

    /// Bytes still buffered, dropped at teardown.
    pub(crate) fn discard_pending(&mut self) -> usize {
        let dropped = self.pending_size;
        self.pending.clear();
        self.pending_size = 0;
        dropped
    }
}
