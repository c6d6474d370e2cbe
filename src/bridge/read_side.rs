//! Read side of the bridge: turns pull requests into sequential reads.

use bytes::{Bytes, BytesMut};
use log::{debug, warn};

use super::event::{BridgeEvent, EventSender};
use super::handle::{HandleSlot, SourceHandle};
use crate::error::{BridgeError, BridgeResult, ReadError};

/// Upper bound for a single read buffer unless the readable high-water mark
/// is larger.
pub const MAX_READ_REQUEST: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    Flowing,
    Ended,
    Failed,
}

/// Owns the source handle and the read offset bookkeeping.
pub struct ReadSide<S> {
    pub(crate) handle: HandleSlot<S>,
    threshold: usize,
    state: ReadState,
    bytes_read: u64,
    events: EventSender,
}

impl<S: SourceHandle> ReadSide<S> {
    pub(crate) fn new(threshold: usize, events: EventSender) -> Self {
        Self {
            handle: HandleSlot::Unopened,
            threshold,
            state: ReadState::Flowing,
            bytes_read: 0,
            events,
        }
    }

    /// Pull one chunk of at most `requested_size` bytes.
    ///
    /// Issues exactly one read from the current offset and returns only the
    /// bytes actually read. `Ok(None)` marks end of file; further pulls keep
    /// returning `None` without touching the handle. A failed read is
    /// terminal for this side: no chunk is produced afterwards.
    ///
    /// A `requested_size` of zero falls back to the configured readable
    /// high-water mark. Larger requests are capped at [`MAX_READ_REQUEST`]
    /// or the high-water mark, whichever is greater.
    pub async fn produce_read(&mut self, requested_size: usize) -> BridgeResult<Option<Bytes>> {
        let source = match &mut self.handle {
            HandleSlot::Open(source) => source,
            HandleSlot::Unopened => return Err(BridgeError::NotOpen),
            HandleSlot::Closed => return Err(BridgeError::UseAfterClose),
        };

        match self.state {
            ReadState::Flowing => {}
            ReadState::Ended => return Ok(None),
            ReadState::Failed => return Err(ReadError::SourceFailed.into()),
        }

        let size = if requested_size == 0 {
            self.threshold
        } else {
            requested_size.min(self.threshold.max(MAX_READ_REQUEST))
        };

        let mut buf = BytesMut::zeroed(size);
        match source.read(&mut buf).await {
            Ok(0) => {
                debug!(
                    target: "duplex_bridge::read",
                    "End of source after {} bytes",
                    self.bytes_read
                );
                self.state = ReadState::Ended;
                self.events.emit(BridgeEvent::End);
                Ok(None)
            }
            Ok(n) => {
                buf.truncate(n);
                self.bytes_read += n as u64;
                Ok(Some(buf.freeze()))
            }
            Err(e) => {
                warn!(
                    target: "duplex_bridge::read",
                    "Read failed at offset {}: {}",
                    self.bytes_read,
                    e
                );
                self.state = ReadState::Failed;
                Err(ReadError::UnderlyingReadFailed(e).into())
            }
        }
    }

    /// Pull one chunk sized by the readable high-water mark.
    pub async fn read_chunk(&mut self) -> BridgeResult<Option<Bytes>> {
        self.produce_read(self.threshold).await
    }

    /// Bytes emitted so far, which is also the current file offset.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn is_ended(&self) -> bool {
        self.state == ReadState::Ended
    }

    pub fn is_failed(&self) -> bool {
        self.state == ReadState::Failed
    }
}
