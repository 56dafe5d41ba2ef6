//! The channel actor.
//!
//! All mutable channel state (connection status, the outbound queue, the
//! pending-call table, liveness) lives here, and every re-entry point
//! (call results, open/close notifications, timer deadlines) arrives through
//! the mailbox. The socket IO loops run in auxiliary tasks and only ever talk
//! to the actor via messages.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use futures_util::StreamExt;
use kameo::error::SendError;
use kameo::prelude::{Actor, ActorRef, Context, Message as KameoMessage, WeakActorRef};
use kameo::reply::{DelegatedReply, ReplySender};
use sonic_rs::Value;
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tracing::{debug, info, warn};

use super::dispatch::{Dispatcher, ServerPush};
use super::pending::PendingCalls;
use super::writer::{WriterActor, WriterWrite, spawn_writer_supervised, spawn_writer_supervisor};
use crate::core::envelope::{Inbound, InvokeReply, KEEPALIVE_ENDPOINT, OutboundEnvelope, parse_inbound};
use crate::core::{
    ChannelError, ChannelHealth, ChannelResult, ChannelSignal, ChannelStats, ChannelStatus,
    DisconnectCause, LivenessConfig, LivenessMonitor, LivenessState, LivenessTransition,
    ReconnectStrategy, WsFrame, correlation_token,
};
use crate::page::PageHost;
use crate::supervision::TypedSupervisor;
use crate::transport::WsTransport;
use crate::transport::tungstenite::TungsteniteTransport;

/// Default bound on the not-yet-sent outbound queue.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

const SIGNAL_CAPACITY: usize = 32;
const PUSH_CAPACITY: usize = 64;

type CallReply = ChannelResult<Value>;

/// Arguments for constructing a channel actor, built once per page session.
pub struct ChannelArgs<H, R, T = TungsteniteTransport>
where
    H: PageHost,
    R: ReconnectStrategy,
    T: WsTransport,
{
    pub url: String,
    pub transport: T,
    pub reconnect: R,
    pub page: Arc<H>,
    pub liveness: LivenessConfig,
    pub outbound_capacity: usize,
}

/// An outbound envelope waiting for a confirmed write. `token` is set for
/// correlated calls so disconnect handling can tell sent from unsent.
struct QueuedEnvelope {
    frame: WsFrame,
    token: Option<String>,
}

/// The participant sync channel.
pub struct ChannelActor<H, R, T = TungsteniteTransport>
where
    H: PageHost,
    R: ReconnectStrategy,
    T: WsTransport,
{
    url: String,
    transport: T,
    reconnect: R,
    dispatcher: Dispatcher<H>,
    pending: PendingCalls<ReplySender<CallReply>>,
    outbound: VecDeque<QueuedEnvelope>,
    outbound_capacity: usize,
    status: ChannelStatus,
    initialized_once: bool,
    no_reconnect: bool,
    connect_inflight: bool,
    startup_armed: bool,
    keepalive_inflight: Option<(String, Instant)>,
    liveness: LivenessMonitor,
    health: ChannelHealth,
    signals: broadcast::Sender<ChannelSignal>,
    actor_ref: ActorRef<Self>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    reader_task: Option<JoinHandle<()>>,
    keepalive_task: Option<JoinHandle<()>>,
    writer_ref: Option<ActorRef<WriterActor<T::Writer>>>,
    writer_supervisor_ref: Option<ActorRef<TypedSupervisor<WriterActor<T::Writer>>>>,
}

impl<H, R, T> Actor for ChannelActor<H, R, T>
where
    H: PageHost,
    R: ReconnectStrategy,
    T: WsTransport,
{
    type Args = ChannelArgs<H, R, T>;
    type Error = ChannelError;

    fn name() -> &'static str {
        "ChannelActor"
    }

    async fn on_start(args: Self::Args, ctx: ActorRef<Self>) -> ChannelResult<Self> {
        let ChannelArgs {
            url,
            transport,
            reconnect,
            page,
            liveness,
            outbound_capacity,
        } = args;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (signals, _) = broadcast::channel(SIGNAL_CAPACITY);

        Ok(Self {
            url,
            transport,
            reconnect,
            dispatcher: Dispatcher::new(page, PUSH_CAPACITY),
            pending: PendingCalls::new(),
            outbound: VecDeque::new(),
            outbound_capacity,
            status: ChannelStatus::Connecting,
            initialized_once: false,
            no_reconnect: false,
            connect_inflight: false,
            startup_armed: false,
            keepalive_inflight: None,
            liveness: LivenessMonitor::new(liveness),
            health: ChannelHealth::new(),
            signals,
            actor_ref: ctx,
            shutdown_tx,
            shutdown_rx,
            reader_task: None,
            keepalive_task: None,
            writer_ref: None,
            writer_supervisor_ref: None,
        })
    }

    async fn on_stop(
        &mut self,
        _ctx: WeakActorRef<Self>,
        _reason: kameo::error::ActorStopReason,
    ) -> ChannelResult<()> {
        self.no_reconnect = true;
        self.stop_io_tasks().await;
        for waiter in self.pending.take_all() {
            waiter.send(Err(ChannelError::Closed));
        }
        Ok(())
    }

    fn on_panic(
        &mut self,
        _actor_ref: kameo::actor::WeakActorRef<Self>,
        err: kameo::prelude::PanicError,
    ) -> impl std::future::Future<
        Output = Result<std::ops::ControlFlow<kameo::prelude::ActorStopReason>, Self::Error>,
    > + Send {
        async move {
            tracing::error!(error = ?err, "ChannelActor panicked");
            Ok(std::ops::ControlFlow::Break(
                kameo::prelude::ActorStopReason::Panicked(err),
            ))
        }
    }
}

/// Channel lifecycle and IO events.
pub enum ChannelEvent {
    /// Open the physical connection (also used by the retry timer).
    Connect,
    /// The physical connection went away.
    Disconnect {
        reason: String,
        cause: DisconnectCause,
    },
    /// A frame arrived from the reader task.
    Inbound(WsFrame),
    /// Periodic keepalive tick.
    KeepaliveTick,
    /// The confirm timeout armed at a keepalive send fired.
    ConfirmDeadline { sent_at: Instant },
    /// The long startup failsafe fired.
    StartupDeadline,
    /// Explicit teardown; no further reconnect attempts.
    Close,
}

impl<H, R, T> KameoMessage<ChannelEvent> for ChannelActor<H, R, T>
where
    H: PageHost,
    R: ReconnectStrategy,
    T: WsTransport,
{
    type Reply = ChannelResult<()>;

    async fn handle(
        &mut self,
        event: ChannelEvent,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        match event {
            ChannelEvent::Connect => self.handle_connect(),
            ChannelEvent::Disconnect { reason, cause } => {
                // A joined reader task can leave a stale notification behind;
                // only a disconnect of the live connection counts.
                if self.status == ChannelStatus::Open {
                    self.handle_disconnect(reason, cause).await;
                } else {
                    debug!(reason = %reason, "ignoring disconnect in non-open state");
                }
            }
            ChannelEvent::Inbound(frame) => self.process_inbound(frame).await,
            ChannelEvent::KeepaliveTick => {
                if self.status == ChannelStatus::Open {
                    self.send_keepalive().await;
                }
            }
            ChannelEvent::ConfirmDeadline { sent_at } => {
                if let Some(transition) = self.liveness.confirm_deadline_passed(sent_at) {
                    self.apply_liveness(transition);
                }
            }
            ChannelEvent::StartupDeadline => {
                if let Some(transition) = self.liveness.startup_deadline_passed() {
                    self.apply_liveness(transition);
                }
            }
            ChannelEvent::Close => self.handle_close().await,
        }
        Ok(())
    }
}

pub(crate) struct ConnectionEstablished<TR: WsTransport>(
    pub(crate) TR::Reader,
    pub(crate) TR::Writer,
);

pub(crate) struct ConnectionFailed {
    pub(crate) error: String,
}

impl<H, R, T> KameoMessage<ConnectionEstablished<T>> for ChannelActor<H, R, T>
where
    H: PageHost,
    R: ReconnectStrategy,
    T: WsTransport,
{
    type Reply = ChannelResult<()>;

    async fn handle(
        &mut self,
        msg: ConnectionEstablished<T>,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        self.on_connection_established(msg.0, msg.1).await;
        Ok(())
    }
}

impl<H, R, T> KameoMessage<ConnectionFailed> for ChannelActor<H, R, T>
where
    H: PageHost,
    R: ReconnectStrategy,
    T: WsTransport,
{
    type Reply = ChannelResult<()>;

    async fn handle(
        &mut self,
        msg: ConnectionFailed,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        self.connect_inflight = false;
        self.health.record_internal_error("connect", &msg.error);
        warn!(error = %msg.error, "connection attempt failed");
        self.schedule_reconnect("connection failed");
        Ok(())
    }
}

/// One remote call. Ask to await the server's reply; tell to fire and forget.
pub struct Call {
    pub endpoint: String,
    pub payload: Value,
}

impl<H, R, T> KameoMessage<Call> for ChannelActor<H, R, T>
where
    H: PageHost,
    R: ReconnectStrategy,
    T: WsTransport,
{
    type Reply = DelegatedReply<CallReply>;

    async fn handle(&mut self, msg: Call, ctx: &mut Context<Self, Self::Reply>) -> Self::Reply {
        let (delegated, reply_sender) = ctx.reply_sender();

        if self.no_reconnect {
            if let Some(tx) = reply_sender {
                tx.send(Err(ChannelError::Closed));
            }
            return delegated;
        }

        let token = correlation_token();
        let envelope = OutboundEnvelope {
            endpoint: msg.endpoint,
            payload: msg.payload,
            future: token.clone(),
        };
        let frame = match envelope.to_frame() {
            Ok(frame) => frame,
            Err(err) => {
                if let Some(tx) = reply_sender {
                    tx.send(Err(err));
                }
                return delegated;
            }
        };

        if let Some(tx) = reply_sender {
            self.pending.register(token.clone(), tx);
        }

        if let Err(err) = self
            .enqueue_outbound(QueuedEnvelope {
                frame,
                token: Some(token.clone()),
            })
            .await
        {
            if let Some(tx) = self.pending.complete(&token) {
                tx.send(Err(err));
            }
        }

        delegated
    }
}

pub struct GetStatus;

impl<H, R, T> KameoMessage<GetStatus> for ChannelActor<H, R, T>
where
    H: PageHost,
    R: ReconnectStrategy,
    T: WsTransport,
{
    type Reply = ChannelResult<ChannelStatus>;

    async fn handle(
        &mut self,
        _msg: GetStatus,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        Ok(self.status)
    }
}

pub struct GetStats;

impl<H, R, T> KameoMessage<GetStats> for ChannelActor<H, R, T>
where
    H: PageHost,
    R: ReconnectStrategy,
    T: WsTransport,
{
    type Reply = ChannelResult<ChannelStats>;

    async fn handle(
        &mut self,
        _msg: GetStats,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        Ok(self.health.get_stats())
    }
}

pub struct GetLiveness;

impl<H, R, T> KameoMessage<GetLiveness> for ChannelActor<H, R, T>
where
    H: PageHost,
    R: ReconnectStrategy,
    T: WsTransport,
{
    type Reply = ChannelResult<LivenessState>;

    async fn handle(
        &mut self,
        _msg: GetLiveness,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        Ok(self.liveness.state())
    }
}

pub struct SubscribeSignals;

impl<H, R, T> KameoMessage<SubscribeSignals> for ChannelActor<H, R, T>
where
    H: PageHost,
    R: ReconnectStrategy,
    T: WsTransport,
{
    type Reply = ChannelResult<broadcast::Receiver<ChannelSignal>>;

    async fn handle(
        &mut self,
        _msg: SubscribeSignals,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        Ok(self.signals.subscribe())
    }
}

pub struct SubscribePushes;

impl<H, R, T> KameoMessage<SubscribePushes> for ChannelActor<H, R, T>
where
    H: PageHost,
    R: ReconnectStrategy,
    T: WsTransport,
{
    type Reply = ChannelResult<broadcast::Receiver<ServerPush>>;

    async fn handle(
        &mut self,
        _msg: SubscribePushes,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        Ok(self.dispatcher.subscribe())
    }
}

impl<H, R, T> ChannelActor<H, R, T>
where
    H: PageHost,
    R: ReconnectStrategy,
    T: WsTransport,
{
    async fn stop_io_tasks(&mut self) {
        let _ = self.shutdown_tx.send(true);
        Self::await_task(&mut self.reader_task).await;
        Self::await_task(&mut self.keepalive_task).await;
        self.teardown_writer().await;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.shutdown_tx = shutdown_tx;
        self.shutdown_rx = shutdown_rx;
        self.writer_ref = None;
    }

    async fn await_task(handle: &mut Option<JoinHandle<()>>) {
        if let Some(handle) = handle.take() {
            if let Err(err) = handle.await {
                warn!("task terminated with error: {err}");
            }
        }
    }

    async fn teardown_writer(&mut self) {
        let writer = self.writer_ref.take();
        if let (Some(writer), Some(supervisor)) = (&writer, self.writer_supervisor_ref.as_ref()) {
            let _ = writer.stop_gracefully().await;
            writer.wait_for_shutdown().await;
            writer.unlink(supervisor).await;
        }
    }

    fn handle_connect(&mut self) {
        if self.no_reconnect {
            return;
        }
        if self.status == ChannelStatus::Open || self.connect_inflight {
            debug!("connect ignored: already open or attempt in flight");
            return;
        }

        self.status = ChannelStatus::Connecting;
        self.connect_inflight = true;

        if !self.startup_armed {
            self.startup_armed = true;
            let failsafe = self.liveness.config().startup_failsafe;
            let actor_ref = self.actor_ref.clone();
            tokio::spawn(async move {
                tokio::time::sleep(failsafe).await;
                let _ = actor_ref.tell(ChannelEvent::StartupDeadline).send().await;
            });
        }

        let self_ref = self.actor_ref.clone();
        let url = self.url.clone();
        let transport = self.transport.clone();
        tokio::spawn(async move {
            match transport.connect(url).await {
                Ok((reader, writer)) => {
                    let _ = self_ref
                        .tell(ConnectionEstablished::<T>(reader, writer))
                        .send()
                        .await;
                }
                Err(err) => {
                    let _ = self_ref
                        .tell(ConnectionFailed {
                            error: err.to_string(),
                        })
                        .send()
                        .await;
                }
            }
        });
    }

    fn schedule_reconnect(&mut self, reason: &str) {
        if self.no_reconnect {
            info!("not reconnecting: channel closed");
            return;
        }
        if !self.reconnect.should_retry() {
            info!(reason, "reconnect suppressed by policy");
            return;
        }

        let delay = self.reconnect.next_delay();
        self.health.increment_reconnect();
        self.status = ChannelStatus::Connecting;
        info!(delay_ms = delay.as_millis() as u64, reason, "scheduling reconnect");

        let actor_ref = self.actor_ref.clone();
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let _ = actor_ref.tell(ChannelEvent::Connect).send().await;
        });
    }

    async fn on_connection_established(&mut self, reader: T::Reader, writer: T::Writer) {
        self.connect_inflight = false;
        if self.no_reconnect {
            info!("discarding connection established after close");
            return;
        }

        info!("channel connection established");
        self.status = ChannelStatus::Open;
        self.reconnect.reset();
        self.health.on_open();

        if self.writer_supervisor_ref.is_none() {
            self.writer_supervisor_ref = Some(spawn_writer_supervisor::<T::Writer>());
        }
        let supervisor = self
            .writer_supervisor_ref
            .as_ref()
            .expect("writer supervisor must be set");
        let writer = spawn_writer_supervised(supervisor, writer, self.shutdown_rx.clone()).await;
        self.writer_ref = Some(writer);

        self.spawn_reader(reader);

        if self.initialized_once {
            self.emit_signal(ChannelSignal::Reconnected);
        }

        self.drain_outbound().await;
        if self.status != ChannelStatus::Open {
            return;
        }
        self.send_keepalive().await;
        if self.status != ChannelStatus::Open {
            return;
        }
        self.start_keepalive_loop();
    }

    fn spawn_reader(&mut self, mut reader: T::Reader) {
        let mut shutdown = self.shutdown_rx.clone();
        let actor_ref = self.actor_ref.clone();
        self.reader_task = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    res = shutdown.changed() => {
                        if res.is_err() || *shutdown.borrow_and_update() {
                            break;
                        }
                    }
                    frame = reader.next() => match frame {
                        Some(Ok(WsFrame::Close(frame))) => {
                            info!(close = ?frame, "received close frame");
                            let _ = actor_ref
                                .tell(ChannelEvent::Disconnect {
                                    reason: "remote closed".to_string(),
                                    cause: DisconnectCause::RemoteClosed,
                                })
                                .send()
                                .await;
                            break;
                        }
                        Some(Ok(frame)) => {
                            if actor_ref.tell(ChannelEvent::Inbound(frame)).send().await.is_err() {
                                break;
                            }
                        }
                        Some(Err(err)) => {
                            let _ = actor_ref
                                .tell(ChannelEvent::Disconnect {
                                    reason: format!("read error: {err}"),
                                    cause: DisconnectCause::ReadFailure {
                                        error: err.to_string(),
                                    },
                                })
                                .send()
                                .await;
                            break;
                        }
                        None => {
                            let _ = actor_ref
                                .tell(ChannelEvent::Disconnect {
                                    reason: "stream ended".to_string(),
                                    cause: DisconnectCause::RemoteClosed,
                                })
                                .send()
                                .await;
                            break;
                        }
                    }
                }
            }
        }));
    }

    fn start_keepalive_loop(&mut self) {
        if let Some(handle) = self.keepalive_task.take() {
            handle.abort();
        }

        let mut shutdown = self.shutdown_rx.clone();
        let interval = self.liveness.config().keepalive_interval;
        let actor_ref = self.actor_ref.clone();

        self.keepalive_task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The on-open keepalive already went out; skip the immediate tick.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        if actor_ref.tell(ChannelEvent::KeepaliveTick).send().await.is_err() {
                            break;
                        }
                    }
                }
            }
        }));
    }

    async fn send_keepalive(&mut self) {
        let token = correlation_token();
        let envelope = OutboundEnvelope {
            endpoint: KEEPALIVE_ENDPOINT.to_string(),
            payload: sonic_rs::json!(null),
            future: token.clone(),
        };
        let frame = match envelope.to_frame() {
            Ok(frame) => frame,
            Err(err) => {
                self.health.record_internal_error("keepalive", &err.to_string());
                return;
            }
        };

        let sent_at = Instant::now();
        self.keepalive_inflight = Some((token, sent_at));

        let confirm_timeout = self.liveness.config().confirm_timeout;
        let actor_ref = self.actor_ref.clone();
        tokio::spawn(async move {
            tokio::time::sleep(confirm_timeout).await;
            let _ = actor_ref
                .tell(ChannelEvent::ConfirmDeadline { sent_at })
                .send()
                .await;
        });

        if let Err(err) = self
            .enqueue_outbound(QueuedEnvelope { frame, token: None })
            .await
        {
            self.health.record_internal_error("keepalive", &err.to_string());
        }
    }

    /// Append to the outbound queue, then push as far as the wire allows.
    /// Entries leave the queue only after a successful write.
    async fn enqueue_outbound(&mut self, envelope: QueuedEnvelope) -> ChannelResult<()> {
        if self.outbound.len() >= self.outbound_capacity {
            self.health.record_internal_error("outbound", "queue full");
            return Err(ChannelError::OutboundQueueFull);
        }
        self.outbound.push_back(envelope);
        if self.status == ChannelStatus::Open {
            self.drain_outbound().await;
        }
        Ok(())
    }

    async fn drain_outbound(&mut self) {
        let Some(writer) = self.writer_ref.clone() else {
            return;
        };

        while let Some(envelope) = self.outbound.pop_front() {
            match writer.ask(WriterWrite {
                frame: envelope.frame.clone(),
            })
            .await
            {
                Ok(()) => {}
                Err(err) => {
                    let error = match err {
                        SendError::HandlerError(inner) => inner.to_string(),
                        _ => "writer unavailable".to_string(),
                    };
                    // Back to the front so retried sends keep their original
                    // order; the drain resumes on the next successful open.
                    self.outbound.push_front(envelope);
                    self.handle_disconnect(
                        format!("write failed: {error}"),
                        DisconnectCause::WriteFailure { error },
                    )
                    .await;
                    break;
                }
            }
        }
    }

    async fn handle_disconnect(&mut self, reason: String, cause: DisconnectCause) {
        if matches!(self.status, ChannelStatus::Closed | ChannelStatus::Closing) {
            return;
        }
        warn!(reason = %reason, cause = %cause.describe(), "connection lost");
        self.status = ChannelStatus::Closed;
        self.stop_io_tasks().await;
        self.keepalive_inflight = None;
        self.fail_sent_calls();
        self.schedule_reconnect(&reason);
    }

    /// Fail fast every call already written to the wire but unanswered.
    /// Queued-but-unsent calls stay pending and drain after reconnect.
    fn fail_sent_calls(&mut self) {
        let queued: HashSet<String> = self
            .outbound
            .iter()
            .filter_map(|envelope| envelope.token.clone())
            .collect();
        let orphans = self.pending.take_sent(|token| queued.contains(token));
        let count = orphans.len();
        for waiter in orphans {
            waiter.send(Err(ChannelError::DisconnectedBeforeReply));
        }
        if count > 0 {
            debug!(count, "rejected in-flight calls after disconnect");
        }
    }

    async fn handle_close(&mut self) {
        if self.no_reconnect && self.status == ChannelStatus::Closed {
            return;
        }
        info!("closing channel");
        self.no_reconnect = true;
        self.status = ChannelStatus::Closing;

        if let Some(writer) = self.writer_ref.clone() {
            let _ = writer
                .ask(WriterWrite {
                    frame: WsFrame::Close(None),
                })
                .await;
        }

        self.stop_io_tasks().await;
        self.status = ChannelStatus::Closed;
        self.liveness.close();
        self.keepalive_inflight = None;
        for waiter in self.pending.take_all() {
            waiter.send(Err(ChannelError::Closed));
        }
        self.outbound.clear();
    }

    async fn process_inbound(&mut self, frame: WsFrame) {
        match frame {
            WsFrame::Ping(payload) => {
                if let Err(err) = self
                    .enqueue_outbound(QueuedEnvelope {
                        frame: WsFrame::Pong(payload),
                        token: None,
                    })
                    .await
                {
                    self.health.record_internal_error("pong", &err.to_string());
                }
            }
            WsFrame::Pong(_) | WsFrame::Close(_) => {}
            WsFrame::Text(bytes) | WsFrame::Binary(bytes) => self.dispatch_bytes(&bytes),
        }
    }

    fn dispatch_bytes(&mut self, bytes: &[u8]) {
        let Some(inbound) = parse_inbound(bytes) else {
            self.health.record_malformed();
            debug!(len = bytes.len(), "dropping malformed inbound message");
            return;
        };

        self.health.record_message();
        if let Some(transition) = self.liveness.on_server_seen(Instant::now()) {
            self.apply_liveness(transition);
        }

        match inbound {
            Inbound::Invoke(reply) => self.complete_call(reply),
            Inbound::Action(action) => self.dispatcher.run_action(action),
            Inbound::Event(event) => self.dispatcher.broadcast_event(event),
            Inbound::Queue(queue) => self.dispatcher.deliver_queued(queue),
            Inbound::Unknown { kind } => {
                debug!(kind = %kind, "ignoring unknown message kind");
            }
            Inbound::Discard { kind } => {
                self.health.record_malformed();
                debug!(kind = %kind, "dropping message with unusable payload");
            }
        }
    }

    fn complete_call(&mut self, reply: InvokeReply) {
        if let Some((token, sent_at)) = self.keepalive_inflight.take() {
            if token == reply.future {
                self.health.record_keepalive_rtt(sent_at.elapsed());
                if reply.error {
                    self.health.record_remote_error(&reply.future);
                } else if !self.initialized_once {
                    self.initialized_once = true;
                    self.emit_signal(ChannelSignal::Ready);
                }
                return;
            }
            self.keepalive_inflight = Some((token, sent_at));
        }

        match self.pending.complete(&reply.future) {
            Some(waiter) => {
                let outcome = if reply.error {
                    self.health.record_remote_error(&reply.future);
                    Err(ChannelError::RemoteException)
                } else {
                    Ok(reply.data)
                };
                waiter.send(outcome);
            }
            None => {
                debug!(future = %reply.future, "no pending call for invoke reply");
            }
        }
    }

    fn apply_liveness(&mut self, transition: LivenessTransition) {
        match transition {
            LivenessTransition::Degraded => {
                warn!("keepalive unanswered: connection degraded");
                self.emit_signal(ChannelSignal::Degraded);
            }
            LivenessTransition::Recovered => {
                info!("server seen again: connection recovered");
                self.emit_signal(ChannelSignal::Recovered);
            }
        }
    }

    fn emit_signal(&self, signal: ChannelSignal) {
        let _ = self.signals.send(signal);
    }
}
