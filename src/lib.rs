pub mod bridge;
pub mod config;
pub mod error;
pub mod pipeline;

pub use bridge::{
    Bridge, BridgeEvent, BridgeState, FsOpener, HandleOpener, MAX_READ_REQUEST, ReadSide,
    SinkHandle, SourceHandle, WriteSide,
};
pub use config::{BridgeConfig, BridgeSettings};
pub use error::{
    BridgeError, BridgeResult, CloseError, ConfigError, FlushError, OpenError, ReadError,
    WriteError,
};
pub use pipeline::{PumpStats, pump};
