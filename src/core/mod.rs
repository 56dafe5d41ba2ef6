pub mod envelope;
pub mod frame;
pub mod health;
pub mod identity;
pub mod liveness;
pub mod reconnect;
pub mod token;
pub mod types;

pub use envelope::{
    CHAT_ADD_ENDPOINT, CHAT_GET_ENDPOINT, EventPush, Inbound, InvokeReply, KEEPALIVE_ENDPOINT,
    OutboundEnvelope, PageAction, QueueEntry, QueuePush, SCRIPT_ERROR_ENDPOINT, parse_inbound,
};
pub use frame::{WsCloseFrame, WsFrame, into_ws_frame};
pub use health::{ChannelHealth, ChannelStats};
pub use identity::Identity;
pub use liveness::{LivenessConfig, LivenessMonitor, LivenessState, LivenessTransition};
pub use reconnect::FixedDelayReconnect;
pub use token::{correlation_token, mint_token};
pub use types::{
    ChannelError, ChannelResult, ChannelSignal, ChannelStatus, DisconnectCause, FrameLimits,
    ReconnectStrategy,
};
