use bytes::Bytes;

/// Transport-neutral websocket frame.
///
/// Transports convert their native frame representation into/from `WsFrame`;
/// everything above the transport seam only ever sees this type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WsFrame {
    Text(Bytes),
    Binary(Bytes),
    Ping(Bytes),
    Pong(Bytes),
    Close(Option<WsCloseFrame>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WsCloseFrame {
    pub code: u16,
    pub reason: Bytes,
}

impl WsFrame {
    /// Payload bytes of data-bearing frames. Close frames carry none.
    #[inline]
    pub fn payload_bytes(&self) -> Option<&[u8]> {
        match self {
            WsFrame::Text(bytes)
            | WsFrame::Binary(bytes)
            | WsFrame::Ping(bytes)
            | WsFrame::Pong(bytes) => Some(bytes.as_ref()),
            WsFrame::Close(_) => None,
        }
    }

    /// Wrap serialized UTF-8 JSON in a text frame without copying.
    #[inline]
    pub fn json(encoded: Vec<u8>) -> Self {
        WsFrame::Text(Bytes::from(encoded))
    }
}

/// Convert owned bytes into a frame, preferring text when valid UTF-8.
#[inline]
pub fn into_ws_frame<B>(bytes: B) -> WsFrame
where
    B: Into<Bytes>,
{
    let payload = bytes.into();
    if std::str::from_utf8(payload.as_ref()).is_ok() {
        WsFrame::Text(payload)
    } else {
        WsFrame::Binary(payload)
    }
}
