//! Lifecycle events published by the bridge.

use tokio::sync::broadcast;

/// Capacity of the event channel. Slow subscribers lag rather than block
/// the bridge.
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Observable lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    /// Both handles are open.
    Opened,
    /// A flush wrote `bytes` to the sink in one operation.
    Flushed { bytes: usize },
    /// The source reached end of file.
    End,
    /// `finalize` completed; the sink holds every accepted byte.
    Finished,
    /// A terminal or overridden error.
    Error(String),
    /// Teardown finished; both handles are closed.
    Closed,
}

/// Sending half shared by the bridge and both of its sides.
#[derive(Debug, Clone)]
pub(crate) struct EventSender(broadcast::Sender<BridgeEvent>);

impl EventSender {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self(tx)
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.0.subscribe()
    }

    /// Publish an event. Having no subscriber is not an error.
    pub(crate) fn emit(&self, event: BridgeEvent) {
        let _ = self.0.send(event);
    }
}
