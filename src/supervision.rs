//! Minimal typed supervisor.
//!
//! Writer actors are "restart-by-reconnect": the connection is recreated, not
//! the actor, so there is no automatic restart policy here. The supervisor's
//! purpose is to provide a stable, actor-managed parent for linking the
//! per-connection writer.

use std::convert::Infallible;
use std::marker::PhantomData;
use std::ops::ControlFlow;

use kameo::{
    Actor,
    actor::{ActorID, ActorRef, WeakActorRef},
    error::ActorStopReason,
};

/// Typed link-based supervisor for homogeneous child actors.
pub struct TypedSupervisor<A>
where
    A: Actor + Send + Sync + 'static,
{
    _name: String,
    _phantom: PhantomData<A>,
}

impl<A> TypedSupervisor<A>
where
    A: Actor + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            _name: name.into(),
            _phantom: PhantomData,
        }
    }
}

impl<A> Actor for TypedSupervisor<A>
where
    A: Actor + Send + Sync + 'static,
{
    type Args = Self;
    type Error = Infallible;

    async fn on_start(args: Self::Args, _actor_ref: ActorRef<Self>) -> Result<Self, Self::Error> {
        Ok(args)
    }

    fn on_link_died(
        &mut self,
        _actor_ref: WeakActorRef<Self>,
        _id: ActorID,
        _reason: ActorStopReason,
    ) -> impl std::future::Future<Output = Result<ControlFlow<ActorStopReason>, Self::Error>> + Send
    {
        async { Ok(ControlFlow::Continue(())) }
    }
}
