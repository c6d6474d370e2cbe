//! Copy pump: streams the bridge's source into its own sink.
//!
//! The pump is the pipeline collaborator of the bridge. It opens the bridge,
//! feeds every chunk pulled from the read side into the write side,
//! finalizes once the source is exhausted and tears the bridge down. Any
//! error, including cancellation, goes through [`Bridge::destroy`] so both
//! handles are always closed.

use log::{debug, info};
use tokio_util::sync::CancellationToken;

use crate::bridge::{Bridge, BridgeState, HandleOpener};
use crate::error::{BridgeError, BridgeResult};

/// Outcome of a completed pump.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub chunks: usize,
    pub flushes: usize,
}

/// Copy the source of `bridge` into its sink until end of file or until
/// `cancel` fires.
///
/// `bridge` may be unopened or already open. On return it is always
/// [`BridgeState::Destroyed`] or [`BridgeState::Failed`].
pub async fn pump<O: HandleOpener>(
    bridge: &mut Bridge<O>,
    cancel: CancellationToken,
) -> BridgeResult<PumpStats> {
    if bridge.state() == BridgeState::Unopened {
        bridge.open().await?;
    }

    let chunks = match copy_chunks(bridge, &cancel).await {
        Ok(chunks) => chunks,
        Err(err) => return Err(destroy_with(bridge, err).await),
    };

    // finalize tears the bridge down itself when the final flush fails
    bridge.finalize().await?;

    let stats = PumpStats {
        bytes_read: bridge.bytes_read(),
        bytes_written: bridge.bytes_written(),
        chunks,
        flushes: bridge.flush_count(),
    };
    bridge.teardown().await?;

    info!(
        target: "duplex_bridge::pump",
        "Copied {} bytes in {} chunks with {} flushes",
        stats.bytes_written,
        stats.chunks,
        stats.flushes
    );
    Ok(stats)
}

/// Move chunks from the read side to the write side until end of file.
async fn copy_chunks<O: HandleOpener>(
    bridge: &mut Bridge<O>,
    cancel: &CancellationToken,
) -> BridgeResult<usize> {
    let request = bridge.config().readable_high_water_mark;
    let (reader, writer) = bridge.split()?;
    let mut chunks = 0;

    loop {
        let next = tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!(target: "duplex_bridge::pump", "Pump cancelled after {} chunks", chunks);
                return Err(BridgeError::Cancelled);
            }

            result = reader.produce_read(request) => result?,
        };

        let Some(chunk) = next else {
            return Ok(chunks);
        };
        chunks += 1;
        writer.accept_write(chunk).await?;
    }
}

async fn destroy_with<O: HandleOpener>(bridge: &mut Bridge<O>, err: BridgeError) -> BridgeError {
    match bridge.destroy(Some(err)).await {
        Err(reported) => reported,
        Ok(()) => BridgeError::UseAfterClose,
    }
}
