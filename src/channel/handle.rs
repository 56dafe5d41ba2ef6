//! Typed client surface over the channel actor.
//!
//! One handle per page session; clones share the same underlying channel.
//! `call` has no timeout of its own: an indefinitely pending call is a
//! possible symptom of reconnection, and a drop of the connection after the
//! call was written fails it with [`ChannelError::DisconnectedBeforeReply`].

use kameo::error::SendError;
use kameo::prelude::{Actor, ActorRef};
use sonic_rs::Value;
use tokio::sync::broadcast;

use super::actor::{
    Call, ChannelActor, ChannelArgs, ChannelEvent, GetLiveness, GetStats, GetStatus,
    SubscribePushes, SubscribeSignals,
};
use super::dispatch::ServerPush;
use crate::core::envelope::{CHAT_ADD_ENDPOINT, CHAT_GET_ENDPOINT, SCRIPT_ERROR_ENDPOINT};
use crate::core::{
    ChannelError, ChannelResult, ChannelSignal, ChannelStats, ChannelStatus, LivenessState,
    ReconnectStrategy,
};
use crate::page::PageHost;
use crate::transport::WsTransport;

pub struct ChannelHandle<H, R, T>
where
    H: PageHost,
    R: ReconnectStrategy,
    T: WsTransport,
{
    actor: ActorRef<ChannelActor<H, R, T>>,
}

impl<H, R, T> Clone for ChannelHandle<H, R, T>
where
    H: PageHost,
    R: ReconnectStrategy,
    T: WsTransport,
{
    fn clone(&self) -> Self {
        Self {
            actor: self.actor.clone(),
        }
    }
}

impl<H, R, T> ChannelHandle<H, R, T>
where
    H: PageHost,
    R: ReconnectStrategy,
    T: WsTransport,
{
    /// Spawn the channel actor. The connection is not opened until
    /// [`ChannelHandle::open`] is called.
    pub fn spawn(args: ChannelArgs<H, R, T>) -> Self {
        Self {
            actor: ChannelActor::spawn(args),
        }
    }

    pub fn actor_ref(&self) -> &ActorRef<ChannelActor<H, R, T>> {
        &self.actor
    }

    /// Open the physical connection.
    pub async fn open(&self) -> ChannelResult<()> {
        self.actor
            .tell(ChannelEvent::Connect)
            .send()
            .await
            .map_err(|_| ChannelError::Closed)
    }

    /// Tear the channel down; no further reconnect attempts.
    pub async fn close(&self) -> ChannelResult<()> {
        self.actor
            .tell(ChannelEvent::Close)
            .send()
            .await
            .map_err(|_| ChannelError::Closed)
    }

    /// Invoke a remote endpoint and await its reply.
    pub async fn call(&self, endpoint: impl Into<String>, payload: Value) -> ChannelResult<Value> {
        self.actor
            .ask(Call {
                endpoint: endpoint.into(),
                payload,
            })
            .await
            .map_err(map_send_error)
    }

    /// Invoke the reserved keepalive endpoint by hand.
    pub async fn hello(&self) -> ChannelResult<Value> {
        self.call(crate::core::KEEPALIVE_ENDPOINT, sonic_rs::json!(null))
            .await
    }

    /// Fire-and-forget report of a client-side script error. The server logs
    /// it; the reply is deliberately not awaited.
    pub async fn report_script_error(&self, message: &str) -> ChannelResult<()> {
        self.actor
            .tell(Call {
                endpoint: SCRIPT_ERROR_ENDPOINT.to_string(),
                payload: sonic_rs::json!(message),
            })
            .send()
            .await
            .map_err(|_| ChannelError::Closed)
    }

    /// Append a chat message to `channel`.
    pub async fn chat_send(&self, channel: &str, text: &str) -> ChannelResult<Value> {
        self.call(CHAT_ADD_ENDPOINT, sonic_rs::json!([channel, text]))
            .await
    }

    /// Fetch the message history of `channel`.
    pub async fn chat_history(&self, channel: &str) -> ChannelResult<Value> {
        self.call(CHAT_GET_ENDPOINT, sonic_rs::json!(channel)).await
    }

    /// Subscribe to lifecycle signals (`Ready`, `Reconnected`, `Degraded`,
    /// `Recovered`). Subscribe before `open` to observe `Ready`.
    pub async fn signals(&self) -> ChannelResult<broadcast::Receiver<ChannelSignal>> {
        self.actor.ask(SubscribeSignals).await.map_err(map_send_error)
    }

    /// Subscribe to server pushes (events and gated queue entries).
    pub async fn pushes(&self) -> ChannelResult<broadcast::Receiver<ServerPush>> {
        self.actor.ask(SubscribePushes).await.map_err(map_send_error)
    }

    pub async fn status(&self) -> ChannelResult<ChannelStatus> {
        self.actor.ask(GetStatus).await.map_err(map_send_error)
    }

    pub async fn stats(&self) -> ChannelResult<ChannelStats> {
        self.actor.ask(GetStats).await.map_err(map_send_error)
    }

    pub async fn liveness(&self) -> ChannelResult<LivenessState> {
        self.actor.ask(GetLiveness).await.map_err(map_send_error)
    }
}

fn map_send_error<M>(err: SendError<M, ChannelError>) -> ChannelError {
    match err {
        SendError::HandlerError(inner) => inner,
        _ => ChannelError::Closed,
    }
}
