use std::future::Future;
use std::pin::Pin;

use futures_util::{Sink, Stream};

use crate::core::{ChannelError, WsFrame};

pub mod tungstenite;

/// Boxed future returned by [`WsTransport::connect`].
pub type WsTransportConnectFuture<R, W> =
    Pin<Box<dyn Future<Output = Result<(R, W), ChannelError>> + Send>>;

/// Transport boundary for channel IO.
///
/// The IO loop lives outside the channel actor; the actor owns state and
/// policy. The trait is intentionally minimal so the websocket implementation
/// can be swapped (the test suite substitutes an in-memory transport) while
/// the protocol logic stays unchanged.
pub trait WsTransport: Clone + Send + Sync + 'static {
    type Reader: Stream<Item = Result<WsFrame, ChannelError>> + Send + Unpin + 'static;
    type Writer: Sink<WsFrame, Error = ChannelError> + Send + Sync + Unpin + 'static;

    fn connect(&self, url: String) -> WsTransportConnectFuture<Self::Reader, Self::Writer>;
}
