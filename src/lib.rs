//! Resilient participant sync channel for browser-based experiment sessions.
//!
//! One logical connection per participant, carried over a single physical
//! websocket at a time: correlated request/response calls, server pushes
//! gated by the current page, an application-level keepalive distinguishing
//! slow from dead connections, and fixed-delay reconnects with FIFO replay of
//! everything that queued up while the wire was down.

pub mod channel;
pub mod core;
pub mod page;
pub mod supervision;
pub mod testing;
pub mod tls;
pub mod transport;

pub use crate::channel::{
    Call, ChannelActor, ChannelArgs, ChannelEvent, ChannelHandle, DEFAULT_OUTBOUND_CAPACITY,
    ServerPush,
};
pub use crate::core::{
    ChannelError, ChannelResult, ChannelSignal, ChannelStats, ChannelStatus, FixedDelayReconnect,
    Identity, LivenessConfig, LivenessState, ReconnectStrategy, WsFrame,
};
pub use crate::page::PageHost;
pub use crate::transport::WsTransport;
pub use crate::transport::tungstenite::TungsteniteTransport;
