use std::time::Duration;

use thiserror::Error;

/// Convenience result alias for channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Canonical error surface of the sync channel.
#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    #[error("connection failed: {0}")]
    ConnectFailed(String),

    #[error("transport error ({context}): {error}")]
    Transport {
        context: &'static str,
        error: String,
    },

    #[error("parse failed: {0}")]
    Parse(String),

    #[error("actor error: {0}")]
    Actor(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("backpressure: outbound queue full")]
    OutboundQueueFull,

    #[error("server-side exception occurred")]
    RemoteException,

    #[error("disconnected before reply")]
    DisconnectedBeforeReply,

    #[error("channel closed")]
    Closed,
}

/// Connection state of the single physical connection the channel owns.
///
/// `Connecting` also covers the waiting period between retry attempts; an
/// explicit `close()` moves through `Closing` into the terminal `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Lifecycle signals surfaced to the hosting page.
///
/// `Ready` fires exactly once per page session, when the first keepalive is
/// answered. Every later successful open fires `Reconnected` instead.
/// `Degraded`/`Recovered` are the liveness monitor's advisory signals and are
/// independent of the transport's own retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSignal {
    Ready,
    Reconnected,
    Degraded,
    Recovered,
}

/// Why the physical connection went away.
#[derive(Debug, Clone)]
pub enum DisconnectCause {
    RemoteClosed,
    ReadFailure { error: String },
    WriteFailure { error: String },
    HandshakeFailed { error: String },
}

impl DisconnectCause {
    pub fn describe(&self) -> String {
        match self {
            DisconnectCause::RemoteClosed => "remote closed".to_string(),
            DisconnectCause::ReadFailure { error } => format!("read failure: {error}"),
            DisconnectCause::WriteFailure { error } => format!("write failure: {error}"),
            DisconnectCause::HandshakeFailed { error } => format!("handshake failed: {error}"),
        }
    }
}

/// Frame size bounds for the underlying websocket.
///
/// Envelopes are small JSON; the defaults only have to keep a misbehaving
/// server from ballooning memory.
#[derive(Clone, Copy, Debug)]
pub struct FrameLimits {
    pub max_message_bytes: usize,
    pub max_frame_bytes: usize,
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self {
            max_message_bytes: 4 * 1024 * 1024,
            max_frame_bytes: 4 * 1024 * 1024,
        }
    }
}

/// Abstract reconnect pacing policy.
pub trait ReconnectStrategy: Send + Sync + 'static {
    fn next_delay(&mut self) -> Duration;
    fn reset(&mut self);
    fn should_retry(&self) -> bool;
}
