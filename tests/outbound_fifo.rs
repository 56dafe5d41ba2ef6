use std::sync::Arc;
use std::time::Duration;

use lablink::channel::{Call, ChannelArgs, ChannelHandle};
use lablink::core::{FixedDelayReconnect, KEEPALIVE_ENDPOINT, LivenessConfig, ReconnectStrategy};
use lablink::testing::{
    MockTransport, RecordingPageHost, answer_keepalive, decode_outbound, mock_link,
};

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

async fn fire_call(
    handle: &ChannelHandle<RecordingPageHost, FixedDelayReconnect, MockTransport>,
    endpoint: &str,
) {
    handle
        .actor_ref()
        .tell(Call {
            endpoint: endpoint.to_string(),
            payload: sonic_rs::json!(null),
        })
        .send()
        .await
        .unwrap();
}

#[tokio::test]
async fn sends_issued_before_open_drain_in_order() {
    let (transport, mut listener) = mock_link();
    let page = Arc::new(RecordingPageHost::with_page("page1"));
    let handle = ChannelHandle::spawn(channel_args(
        transport,
        page,
        FixedDelayReconnect::new(Duration::from_millis(50)),
    ));

    // Not open yet: everything queues.
    fire_call(&handle, "first").await;
    fire_call(&handle, "second").await;
    fire_call(&handle, "third").await;

    handle.open().await.unwrap();
    let mut server = listener.accept().await.unwrap();

    let mut seen = Vec::new();
    for _ in 0..4 {
        let frame = server
            .recv_outbound_timeout(Duration::from_secs(5))
            .await
            .expect("queued envelope expected");
        seen.push(decode_outbound(&frame).unwrap().endpoint);
    }
    // Queue drains strictly FIFO before the on-open keepalive goes out.
    assert_eq!(seen, vec!["first", "second", "third", KEEPALIVE_ENDPOINT]);
}

#[tokio::test]
async fn sends_issued_while_disconnected_drain_in_order_after_reconnect() {
    let (transport, mut listener) = mock_link();
    let page = Arc::new(RecordingPageHost::with_page("page1"));
    let handle = ChannelHandle::spawn(channel_args(
        transport,
        page,
        FixedDelayReconnect::new(Duration::from_millis(50)),
    ));

    handle.open().await.unwrap();
    let mut server = listener.accept().await.unwrap();
    answer_keepalive(&mut server).await;

    // Kill the connection entirely; subsequent sends must queue.
    drop(server);
    tokio::time::sleep(Duration::from_millis(20)).await;

    fire_call(&handle, "alpha").await;
    fire_call(&handle, "beta").await;

    let mut server = listener.accept().await.expect("reconnect expected");
    let mut seen = Vec::new();
    for _ in 0..3 {
        let frame = server
            .recv_outbound_timeout(Duration::from_secs(5))
            .await
            .expect("drained envelope expected");
        seen.push(decode_outbound(&frame).unwrap().endpoint);
    }
    assert_eq!(seen, vec!["alpha", "beta", KEEPALIVE_ENDPOINT]);
}
