use futures_util::{Sink, SinkExt};
use kameo::prelude::{Actor, ActorRef, Context, Message as KameoMessage};
use tokio::sync::watch;
use tracing::debug;

use crate::core::{ChannelError, ChannelResult, WsFrame};
use crate::supervision::TypedSupervisor;

/// Writer actor that owns the transport's write half and serializes writes.
///
/// One writer exists per physical connection; a reconnect spawns a fresh one.
pub struct WriterActor<W>
where
    W: Sink<WsFrame, Error = ChannelError> + Send + Sync + Unpin + 'static,
{
    writer: W,
    shutdown_rx: watch::Receiver<bool>,
}

impl<W> WriterActor<W>
where
    W: Sink<WsFrame, Error = ChannelError> + Send + Sync + Unpin + 'static,
{
    pub fn new(writer: W, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            writer,
            shutdown_rx,
        }
    }
}

impl<W> Actor for WriterActor<W>
where
    W: Sink<WsFrame, Error = ChannelError> + Send + Sync + Unpin + 'static,
{
    type Args = Self;
    type Error = ChannelError;

    fn name() -> &'static str {
        "WriterActor"
    }

    async fn on_start(args: Self::Args, _ctx: ActorRef<Self>) -> Result<Self, Self::Error> {
        Ok(args)
    }

    fn on_panic(
        &mut self,
        _actor_ref: kameo::actor::WeakActorRef<Self>,
        err: kameo::prelude::PanicError,
    ) -> impl std::future::Future<
        Output = Result<std::ops::ControlFlow<kameo::prelude::ActorStopReason>, Self::Error>,
    > + Send {
        async move {
            tracing::error!(error = ?err, "WriterActor panicked");
            Ok(std::ops::ControlFlow::Break(
                kameo::prelude::ActorStopReason::Panicked(err),
            ))
        }
    }
}

pub struct WriterWrite {
    pub frame: WsFrame,
}

impl<W> KameoMessage<WriterWrite> for WriterActor<W>
where
    W: Sink<WsFrame, Error = ChannelError> + Send + Sync + Unpin + 'static,
{
    type Reply = ChannelResult<()>;

    async fn handle(
        &mut self,
        msg: WriterWrite,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        if *self.shutdown_rx.borrow() {
            return Err(ChannelError::InvalidState("writer stopped".to_string()));
        }
        debug!(target: "lablink-writer", "sending frame to wire");
        self.writer.send(msg.frame).await?;
        Ok(())
    }
}

/// Spawn a supervisor for writer instances.
///
/// Restart requires a new connection, so the supervisor never restarts
/// children; it only keeps the link tree intact.
pub fn spawn_writer_supervisor<W>() -> ActorRef<TypedSupervisor<WriterActor<W>>>
where
    W: Sink<WsFrame, Error = ChannelError> + Send + Sync + Unpin + 'static,
{
    TypedSupervisor::spawn(TypedSupervisor::new("lablink-writer"))
}

/// Spawn a writer and link it to an existing supervisor.
pub async fn spawn_writer_supervised<W>(
    supervisor: &ActorRef<TypedSupervisor<WriterActor<W>>>,
    writer: W,
    shutdown_rx: watch::Receiver<bool>,
) -> ActorRef<WriterActor<W>>
where
    W: Sink<WsFrame, Error = ChannelError> + Send + Sync + Unpin + 'static,
{
    let actor = WriterActor::spawn(WriterActor::new(writer, shutdown_rx));
    actor.link(supervisor).await;
    actor
}
