//! Reusable test utilities for exercising the channel without a real socket.
//!
//! [`mock_link`] builds an in-memory transport plus a listener handle; every
//! `connect` hands the test a fresh [`MockServer`] it can script: receive
//! outbound envelopes, push inbound ones, or drop the socket. Reconnect
//! scenarios work exactly like against a real server.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::Sink;
use tokio::sync::mpsc;

use crate::core::envelope::OutboundEnvelope;
use crate::core::{ChannelError, ReconnectStrategy, WsFrame, into_ws_frame};
use crate::page::PageHost;
use crate::transport::{WsTransport, WsTransportConnectFuture};

/// Build a transport/listener pair wired through in-memory channels.
pub fn mock_link() -> (MockTransport, MockListener) {
    let (accepts_tx, accepts_rx) = mpsc::unbounded_channel();
    (
        MockTransport { accepts_tx },
        MockListener { accepts_rx },
    )
}

/// In-memory transport handed to the channel actor.
#[derive(Clone)]
pub struct MockTransport {
    accepts_tx: mpsc::UnboundedSender<MockServer>,
}

/// Test-side accept loop: yields one [`MockServer`] per established
/// connection. Dropping the listener makes further connects fail, which is
/// how tests exercise the retry path.
pub struct MockListener {
    accepts_rx: mpsc::UnboundedReceiver<MockServer>,
}

impl MockListener {
    pub async fn accept(&mut self) -> Option<MockServer> {
        self.accepts_rx.recv().await
    }

    pub async fn accept_timeout(&mut self, timeout: Duration) -> Option<MockServer> {
        tokio::time::timeout(timeout, self.accepts_rx.recv())
            .await
            .unwrap_or_default()
    }
}

impl WsTransport for MockTransport {
    type Reader = MockReader;
    type Writer = MockWriter;

    fn connect(&self, _url: String) -> WsTransportConnectFuture<Self::Reader, Self::Writer> {
        let accepts_tx = self.accepts_tx.clone();
        Box::pin(async move {
            let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<WsFrame>();
            let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<WsFrame>();
            let server = MockServer {
                outbound_rx,
                inbound_tx: Some(inbound_tx),
            };
            accepts_tx
                .send(server)
                .map_err(|_| ChannelError::ConnectFailed("mock listener gone".to_string()))?;
            Ok((
                MockReader { rx: inbound_rx },
                MockWriter { tx: outbound_tx },
            ))
        })
    }
}

/// Server-side handle for one established mock connection.
pub struct MockServer {
    outbound_rx: mpsc::UnboundedReceiver<WsFrame>,
    inbound_tx: Option<mpsc::UnboundedSender<WsFrame>>,
}

impl MockServer {
    /// Receive a frame the channel wrote to the wire.
    pub async fn recv_outbound(&mut self) -> Option<WsFrame> {
        self.outbound_rx.recv().await
    }

    pub async fn recv_outbound_timeout(&mut self, timeout: Duration) -> Option<WsFrame> {
        tokio::time::timeout(timeout, self.outbound_rx.recv())
            .await
            .unwrap_or_default()
    }

    /// Push an inbound frame to the channel.
    pub fn send_inbound(&self, frame: WsFrame) -> Result<(), ChannelError> {
        let Some(tx) = self.inbound_tx.as_ref() else {
            return Err(ChannelError::InvalidState(
                "mock socket already dropped".to_string(),
            ));
        };
        tx.send(frame)
            .map_err(|_| ChannelError::InvalidState("mock reader gone".to_string()))
    }

    /// Push a UTF-8 payload as a text frame.
    pub fn send_text(&self, text: impl AsRef<str>) -> Result<(), ChannelError> {
        self.send_inbound(into_ws_frame(text.as_ref().as_bytes().to_vec()))
    }

    /// Simulate a server-side socket drop: the channel's reader sees its
    /// stream end and the disconnect machinery takes over.
    pub fn drop_socket(&mut self) {
        self.inbound_tx = None;
    }
}

/// Reader side for [`MockTransport`].
pub struct MockReader {
    rx: mpsc::UnboundedReceiver<WsFrame>,
}

impl futures_util::Stream for MockReader {
    type Item = Result<WsFrame, ChannelError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match Pin::new(&mut self.rx).poll_recv(cx) {
            Poll::Ready(Some(frame)) => Poll::Ready(Some(Ok(frame))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Writer side for [`MockTransport`].
pub struct MockWriter {
    tx: mpsc::UnboundedSender<WsFrame>,
}

impl Sink<WsFrame> for MockWriter {
    type Error = ChannelError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, item: WsFrame) -> Result<(), Self::Error> {
        self.get_mut()
            .tx
            .send(item)
            .map_err(|_| ChannelError::Transport {
                context: "mock_write",
                error: "mock outbound channel closed".to_string(),
            })
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }
}

/// Reconnect policy that never retries.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoReconnect;

impl ReconnectStrategy for NoReconnect {
    fn next_delay(&mut self) -> Duration {
        Duration::from_secs(24 * 60 * 60)
    }

    fn reset(&mut self) {}

    fn should_retry(&self) -> bool {
        false
    }
}

/// Page host that records every navigation call and lets tests move the
/// current page around.
#[derive(Debug, Default)]
pub struct RecordingPageHost {
    current: std::sync::Mutex<Option<String>>,
    actions: std::sync::Mutex<Vec<String>>,
}

impl RecordingPageHost {
    pub fn with_page(page: &str) -> Self {
        let host = Self::default();
        host.set_page(Some(page));
        host
    }

    pub fn set_page(&self, page: Option<&str>) {
        *self.current.lock().unwrap() = page.map(str::to_string);
    }

    pub fn actions(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }
}

impl PageHost for RecordingPageHost {
    fn current_page(&self) -> Option<String> {
        self.current.lock().unwrap().clone()
    }

    fn reload(&self) {
        self.actions.lock().unwrap().push("reload".to_string());
    }

    fn redirect(&self, url: &str) {
        self.actions.lock().unwrap().push(format!("redirect:{url}"));
    }

    fn submit_primary_form(&self) {
        self.actions.lock().unwrap().push("submit".to_string());
    }
}

/// Decode an outbound frame back into its envelope.
pub fn decode_outbound(frame: &WsFrame) -> Option<OutboundEnvelope> {
    sonic_rs::from_slice(frame.payload_bytes()?).ok()
}

/// Build an `invoke` reply envelope. `data_json` is raw JSON.
pub fn invoke_reply(future: &str, data_json: &str, error: bool) -> String {
    format!(
        r#"{{"kind":"invoke","payload":{{"future":"{future}","data":{data_json},"error":{error}}}}}"#
    )
}

/// Build an `event` envelope. `detail_json` is raw JSON.
pub fn event_push(event: &str, detail_json: &str) -> String {
    format!(r#"{{"kind":"event","payload":{{"event":"{event}","detail":{detail_json}}}}}"#)
}

/// Build a `queue` envelope. `data_json` is raw JSON.
pub fn queue_push(
    recipient: &str,
    event: Option<&str>,
    constraint: Option<&str>,
    data_json: &str,
) -> String {
    let mut entry = String::new();
    if let Some(event) = event {
        entry.push_str(&format!(r#""event":"{event}","#));
    }
    if let Some(constraint) = constraint {
        entry.push_str(&format!(r#""constraint":"{constraint}","#));
    }
    entry.push_str(&format!(r#""data":{data_json}"#));
    format!(r#"{{"kind":"queue","payload":{{"u":"{recipient}","entry":{{{entry}}}}}}}"#)
}

/// Build an `action` envelope.
pub fn action_push(action: &str, url: Option<&str>) -> String {
    match url {
        Some(url) => {
            format!(r#"{{"kind":"action","payload":{{"action":"{action}","url":"{url}"}}}}"#)
        }
        None => format!(r#"{{"kind":"action","payload":{{"action":"{action}"}}}}"#),
    }
}

/// Consume the channel's on-open keepalive and answer it, so tests that do
/// not care about liveness can get to their own traffic.
pub async fn answer_keepalive(server: &mut MockServer) -> OutboundEnvelope {
    let frame = server
        .recv_outbound_timeout(Duration::from_secs(5))
        .await
        .expect("keepalive frame expected");
    let envelope = decode_outbound(&frame).expect("keepalive must decode");
    assert_eq!(envelope.endpoint, crate::core::KEEPALIVE_ENDPOINT);
    server
        .send_text(invoke_reply(&envelope.future, "null", false))
        .expect("reply to keepalive");
    envelope
}
