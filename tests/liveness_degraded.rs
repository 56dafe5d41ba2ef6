//! Liveness is advisory: a silent server degrades the channel without
//! touching the transport, and any inbound traffic recovers it.

use std::sync::Arc;
use std::time::Duration;

use lablink::channel::{ChannelArgs, ChannelHandle};
use lablink::core::{
    ChannelSignal, ChannelStatus, KEEPALIVE_ENDPOINT, LivenessConfig, LivenessState,
    ReconnectStrategy,
};
use lablink::testing::{
    MockTransport, NoReconnect, RecordingPageHost, decode_outbound, event_push, mock_link,
};

fn channel_args<R: ReconnectStrategy>(
    transport: MockTransport,
    page: Arc<RecordingPageHost>,
    reconnect: R,
    liveness: LivenessConfig,
) -> ChannelArgs<RecordingPageHost, R, MockTransport> {
    ChannelArgs {
        url: "ws://mock.test/ws/wave1/kestrel/".to_string(),
        transport,
        reconnect,
        page,
        liveness,
        outbound_capacity: 64,
    }
}

async fn next_signal(rx: &mut tokio::sync::broadcast::Receiver<ChannelSignal>) -> ChannelSignal {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("signal expected")
        .expect("signal channel alive")
}

#[tokio::test]
async fn unanswered_keepalive_degrades_then_inbound_recovers() {
    let liveness = LivenessConfig {
        keepalive_interval: Duration::from_secs(60),
        confirm_timeout: Duration::from_millis(100),
        startup_failsafe: Duration::from_secs(60),
    };
    let (transport, mut listener) = mock_link();
    let page = Arc::new(RecordingPageHost::with_page("page1"));
    let handle = ChannelHandle::spawn(channel_args(transport, page, NoReconnect, liveness));
    let mut signals = handle.signals().await.unwrap();

    handle.open().await.unwrap();
    let mut server = listener.accept().await.unwrap();

    // Swallow the keepalive without answering.
    let frame = server
        .recv_outbound_timeout(Duration::from_secs(5))
        .await
        .expect("keepalive expected");
    assert_eq!(decode_outbound(&frame).unwrap().endpoint, KEEPALIVE_ENDPOINT);

    assert_eq!(next_signal(&mut signals).await, ChannelSignal::Degraded);
    assert_eq!(handle.liveness().await.unwrap(), LivenessState::Degraded);
    // Advisory only: the transport stays open.
    assert_eq!(handle.status().await.unwrap(), ChannelStatus::Open);

    // Any inbound envelope clears the degradation.
    server.send_text(event_push("StillHere", "null")).unwrap();
    assert_eq!(next_signal(&mut signals).await, ChannelSignal::Recovered);
    assert_eq!(handle.liveness().await.unwrap(), LivenessState::Confirmed);
}

#[tokio::test]
async fn startup_failsafe_degrades_when_channel_never_opens() {
    let liveness = LivenessConfig {
        keepalive_interval: Duration::from_secs(60),
        confirm_timeout: Duration::from_secs(30),
        startup_failsafe: Duration::from_millis(150),
    };
    let (transport, listener) = mock_link();
    // No listener: every connect attempt fails.
    drop(listener);

    let page = Arc::new(RecordingPageHost::with_page("page1"));
    let handle = ChannelHandle::spawn(channel_args(transport, page, NoReconnect, liveness));
    let mut signals = handle.signals().await.unwrap();

    handle.open().await.unwrap();

    assert_eq!(next_signal(&mut signals).await, ChannelSignal::Degraded);
    assert_eq!(handle.liveness().await.unwrap(), LivenessState::Degraded);
}

#[tokio::test]
async fn answered_keepalive_reports_rtt_and_stays_confirmed() {
    let liveness = LivenessConfig {
        keepalive_interval: Duration::from_millis(200),
        confirm_timeout: Duration::from_millis(150),
        startup_failsafe: Duration::from_secs(60),
    };
    let (transport, mut listener) = mock_link();
    let page = Arc::new(RecordingPageHost::with_page("page1"));
    let handle = ChannelHandle::spawn(channel_args(transport, page, NoReconnect, liveness));
    let mut signals = handle.signals().await.unwrap();

    handle.open().await.unwrap();
    let mut server = listener.accept().await.unwrap();

    // Answer several keepalive periods promptly.
    for _ in 0..3 {
        let frame = server
            .recv_outbound_timeout(Duration::from_secs(5))
            .await
            .expect("keepalive expected");
        let envelope = decode_outbound(&frame).unwrap();
        assert_eq!(envelope.endpoint, KEEPALIVE_ENDPOINT);
        server
            .send_text(lablink::testing::invoke_reply(&envelope.future, "null", false))
            .unwrap();
    }

    assert_eq!(next_signal(&mut signals).await, ChannelSignal::Ready);
    assert_eq!(handle.liveness().await.unwrap(), LivenessState::Confirmed);

    let stats = handle.stats().await.unwrap();
    assert!(stats.rtt_samples >= 1);
}
