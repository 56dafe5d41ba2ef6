//! Disconnect-before-reply semantics: calls already written to the wire fail
//! fast, calls still waiting in the outbound queue survive the reconnect and
//! drain in order.

use std::sync::Arc;
use std::time::Duration;

use lablink::channel::{ChannelArgs, ChannelHandle};
use lablink::core::{
    ChannelError, FixedDelayReconnect, KEEPALIVE_ENDPOINT, LivenessConfig, ReconnectStrategy,
};
use lablink::testing::{
    MockTransport, NoReconnect, RecordingPageHost, answer_keepalive, decode_outbound, invoke_reply,
    mock_link,
};
use sonic_rs::JsonValueTrait;

fn idle_liveness() -> LivenessConfig {
    LivenessConfig {
        keepalive_interval: Duration::from_secs(60),
        confirm_timeout: Duration::from_secs(30),
        startup_failsafe: Duration::from_secs(60),
    }
}

fn channel_args<R: ReconnectStrategy>(
    transport: MockTransport,
    page: Arc<RecordingPageHost>,
    reconnect: R,
) -> ChannelArgs<RecordingPageHost, R, MockTransport> {
    ChannelArgs {
        url: "ws://mock.test/ws/wave1/kestrel/".to_string(),
        transport,
        reconnect,
        page,
        liveness: idle_liveness(),
        outbound_capacity: 64,
    }
}

#[tokio::test]
async fn sent_call_fails_fast_on_disconnect_and_fresh_call_succeeds() {
    let (transport, mut listener) = mock_link();
    let page = Arc::new(RecordingPageHost::with_page("page1"));
    let handle = ChannelHandle::spawn(channel_args(
        transport,
        page,
        FixedDelayReconnect::new(Duration::from_millis(100)),
    ));

    handle.open().await.unwrap();
    let mut server = listener.accept().await.unwrap();
    answer_keepalive(&mut server).await;

    // Call goes out on the wire, but the server never answers.
    let caller = handle.clone();
    let orphan = tokio::spawn(async move { caller.hello().await });
    let frame = server
        .recv_outbound_timeout(Duration::from_secs(5))
        .await
        .expect("call envelope expected");
    assert_eq!(decode_outbound(&frame).unwrap().endpoint, KEEPALIVE_ENDPOINT);

    server.drop_socket();

    let err = orphan.await.unwrap().expect_err("orphaned call must fail");
    assert!(matches!(err, ChannelError::DisconnectedBeforeReply));

    // A fresh call after the reconnect resolves normally. The orphan's
    // envelope was already sent, so nothing drains ahead of the new traffic.
    let mut server = listener
        .accept_timeout(Duration::from_secs(5))
        .await
        .expect("reconnect expected");
    answer_keepalive(&mut server).await;

    let caller = handle.clone();
    let fresh = tokio::spawn(async move { caller.hello().await });
    let frame = server
        .recv_outbound_timeout(Duration::from_secs(5))
        .await
        .expect("fresh call envelope expected");
    let envelope = decode_outbound(&frame).unwrap();
    server
        .send_text(invoke_reply(&envelope.future, "\"ok\"", false))
        .unwrap();

    let value = fresh.await.unwrap().unwrap();
    assert_eq!(value.as_str(), Some("ok"));
}

#[tokio::test]
async fn queued_unsent_call_survives_reconnect() {
    let (transport, mut listener) = mock_link();
    let page = Arc::new(RecordingPageHost::with_page("page1"));
    let handle = ChannelHandle::spawn(channel_args(
        transport,
        page,
        FixedDelayReconnect::new(Duration::from_millis(100)),
    ));

    handle.open().await.unwrap();
    let mut server = listener.accept().await.unwrap();
    answer_keepalive(&mut server).await;

    // Take the connection down, then issue a call while disconnected.
    drop(server);
    tokio::time::sleep(Duration::from_millis(20)).await;

    let caller = handle.clone();
    let queued = tokio::spawn(async move { caller.call("later", sonic_rs::json!(41)).await });

    let mut server = listener
        .accept_timeout(Duration::from_secs(5))
        .await
        .expect("reconnect expected");
    let frame = server
        .recv_outbound_timeout(Duration::from_secs(5))
        .await
        .expect("queued call drains first");
    let envelope = decode_outbound(&frame).unwrap();
    assert_eq!(envelope.endpoint, "later");
    server
        .send_text(invoke_reply(&envelope.future, "42", false))
        .unwrap();

    let value = queued.await.unwrap().unwrap();
    assert_eq!(value.as_i64(), Some(42));
}

#[tokio::test]
async fn explicit_close_rejects_pending_calls() {
    let (transport, mut listener) = mock_link();
    let page = Arc::new(RecordingPageHost::with_page("page1"));
    let handle = ChannelHandle::spawn(channel_args(transport, page, NoReconnect));

    handle.open().await.unwrap();
    let mut server = listener.accept().await.unwrap();
    answer_keepalive(&mut server).await;

    let caller = handle.clone();
    let pending = tokio::spawn(async move { caller.call("stuck", sonic_rs::json!(null)).await });
    server
        .recv_outbound_timeout(Duration::from_secs(5))
        .await
        .expect("call envelope expected");

    handle.close().await.unwrap();

    let err = pending.await.unwrap().expect_err("close must reject");
    assert!(matches!(err, ChannelError::Closed));
}
