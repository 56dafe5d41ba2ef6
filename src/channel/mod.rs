pub mod actor;
pub mod dispatch;
pub mod handle;
pub mod pending;
pub mod writer;

pub use actor::{
    Call, ChannelActor, ChannelArgs, ChannelEvent, DEFAULT_OUTBOUND_CAPACITY, GetLiveness,
    GetStats, GetStatus, SubscribePushes, SubscribeSignals,
};
pub use dispatch::ServerPush;
pub use handle::ChannelHandle;
pub use pending::PendingCalls;
pub use writer::{WriterActor, WriterWrite, spawn_writer_supervised, spawn_writer_supervisor};
