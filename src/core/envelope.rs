//! Wire envelopes of the sync protocol.
//!
//! Outbound: `{"endpoint": name, "payload": any, "future": token}`.
//! Inbound: `{"kind": k, "payload": {...}}` where `kind` selects the payload
//! shape. Unknown kinds are ignored without error; envelopes missing either
//! field are malformed and dropped.

use serde::{Deserialize, Serialize};
use sonic_rs::Value;

use super::frame::WsFrame;
use super::types::{ChannelError, ChannelResult};

/// Reserved keepalive endpoint, invoked with a null payload.
pub const KEEPALIVE_ENDPOINT: &str = "hello";
/// Fire-and-forget client-side script error reports.
pub const SCRIPT_ERROR_ENDPOINT: &str = "jserrors";
/// Append a chat message: payload `[channel, text]`.
pub const CHAT_ADD_ENDPOINT: &str = "chat_add";
/// Fetch chat history: payload is the channel name.
pub const CHAT_GET_ENDPOINT: &str = "chat_get";

fn null_value() -> Value {
    sonic_rs::json!(null)
}

/// One outbound remote call. `future` is the correlation token binding the
/// call to its eventual `invoke` reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundEnvelope {
    pub endpoint: String,
    pub payload: Value,
    pub future: String,
}

impl OutboundEnvelope {
    pub fn to_frame(&self) -> ChannelResult<WsFrame> {
        let encoded = sonic_rs::to_vec(self).map_err(|err| ChannelError::Parse(err.to_string()))?;
        Ok(WsFrame::json(encoded))
    }
}

/// Reply to one pending call. `error: true` means the server-side handler
/// raised; `data` carries the result otherwise.
#[derive(Debug, Clone, Deserialize)]
pub struct InvokeReply {
    pub future: String,
    #[serde(default = "null_value")]
    pub data: Value,
    #[serde(default)]
    pub error: bool,
}

/// A named server broadcast with no correlation and no ordering guarantee.
#[derive(Debug, Clone, Deserialize)]
pub struct EventPush {
    pub event: String,
    #[serde(default = "null_value")]
    pub detail: Value,
}

/// An ordered, optionally page-scoped delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct QueuePush {
    /// Recipient identity, as addressed by the server.
    pub u: String,
    pub entry: QueueEntry,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueEntry {
    #[serde(default)]
    pub event: Option<String>,
    /// Required current-page identifier; a mismatch drops the entry silently.
    #[serde(default)]
    pub constraint: Option<String>,
    #[serde(default = "null_value")]
    pub data: Value,
}

/// A fire-and-forget instruction executed immediately, at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageAction {
    Reload,
    Redirect(String),
    Submit,
}

#[derive(Debug, Deserialize)]
struct Probe {
    kind: String,
    #[allow(dead_code)]
    payload: Value,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", content = "payload")]
enum WireInbound {
    #[serde(rename = "invoke")]
    Invoke(InvokeReply),
    #[serde(rename = "action")]
    Action(WireAction),
    #[serde(rename = "event")]
    Event(EventPush),
    #[serde(rename = "queue")]
    Queue(QueuePush),
}

#[derive(Debug, Deserialize)]
struct WireAction {
    action: String,
    #[serde(default)]
    url: Option<String>,
}

/// Classified inbound message.
#[derive(Debug)]
pub enum Inbound {
    Invoke(InvokeReply),
    Action(PageAction),
    Event(EventPush),
    Queue(QueuePush),
    /// Envelope parsed, but the kind is not one this client knows.
    Unknown { kind: String },
    /// Envelope parsed, but the payload does not fit its kind.
    Discard { kind: String },
}

/// Parse one inbound frame payload.
///
/// `None` means the message is malformed (not a JSON object carrying both
/// `kind` and `payload`) and must be dropped without counting as server
/// activity. Every `Some` value, including `Unknown`, counts as activity.
pub fn parse_inbound(bytes: &[u8]) -> Option<Inbound> {
    let probe: Probe = sonic_rs::from_slice(bytes).ok()?;

    if !matches!(probe.kind.as_str(), "invoke" | "action" | "event" | "queue") {
        return Some(Inbound::Unknown { kind: probe.kind });
    }

    match sonic_rs::from_slice::<WireInbound>(bytes) {
        Ok(WireInbound::Invoke(reply)) => Some(Inbound::Invoke(reply)),
        Ok(WireInbound::Action(raw)) => Some(match classify_action(raw) {
            Some(action) => Inbound::Action(action),
            None => Inbound::Discard { kind: probe.kind },
        }),
        Ok(WireInbound::Event(event)) => Some(Inbound::Event(event)),
        Ok(WireInbound::Queue(queue)) => Some(Inbound::Queue(queue)),
        Err(_) => Some(Inbound::Discard { kind: probe.kind }),
    }
}

fn classify_action(raw: WireAction) -> Option<PageAction> {
    match raw.action.as_str() {
        "reload" => Some(PageAction::Reload),
        "redirect" => raw.url.map(PageAction::Redirect),
        "submit" => Some(PageAction::Submit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonic_rs::JsonValueTrait;

    #[test]
    fn outbound_envelope_serializes_wire_fields() {
        let envelope = OutboundEnvelope {
            endpoint: "hello".to_string(),
            payload: sonic_rs::json!(null),
            future: "a1b2c3".to_string(),
        };
        let frame = envelope.to_frame().unwrap();
        let bytes = frame.payload_bytes().unwrap();
        let echoed: OutboundEnvelope = sonic_rs::from_slice(bytes).unwrap();
        assert_eq!(echoed.endpoint, "hello");
        assert_eq!(echoed.future, "a1b2c3");
    }

    #[test]
    fn invoke_reply_parses_with_defaults() {
        let raw = br#"{"kind":"invoke","payload":{"future":"tok1","data":{"n":7}}}"#;
        match parse_inbound(raw) {
            Some(Inbound::Invoke(reply)) => {
                assert_eq!(reply.future, "tok1");
                assert!(!reply.error);
                assert_eq!(reply.data.get("n").and_then(|v| v.as_i64()), Some(7));
            }
            other => panic!("expected invoke, got {other:?}"),
        }
    }

    #[test]
    fn action_kinds_classify() {
        let reload = br#"{"kind":"action","payload":{"action":"reload"}}"#;
        assert!(matches!(
            parse_inbound(reload),
            Some(Inbound::Action(PageAction::Reload))
        ));

        let redirect = br#"{"kind":"action","payload":{"action":"redirect","url":"/next"}}"#;
        match parse_inbound(redirect) {
            Some(Inbound::Action(PageAction::Redirect(url))) => assert_eq!(url, "/next"),
            other => panic!("expected redirect, got {other:?}"),
        }

        // Redirect without a target is not executable.
        let bare = br#"{"kind":"action","payload":{"action":"redirect"}}"#;
        assert!(matches!(parse_inbound(bare), Some(Inbound::Discard { .. })));

        let unknown = br#"{"kind":"action","payload":{"action":"teleport"}}"#;
        assert!(matches!(parse_inbound(unknown), Some(Inbound::Discard { .. })));
    }

    #[test]
    fn queue_entry_keeps_constraint_and_extra_fields_are_ignored() {
        let raw = br#"{"kind":"queue","payload":{"u":"kestrel","entry":{"source":"chat","event":"Chatted","constraint":"page3","data":[1,2]}}}"#;
        match parse_inbound(raw) {
            Some(Inbound::Queue(queue)) => {
                assert_eq!(queue.u, "kestrel");
                assert_eq!(queue.entry.event.as_deref(), Some("Chatted"));
                assert_eq!(queue.entry.constraint.as_deref(), Some("page3"));
            }
            other => panic!("expected queue, got {other:?}"),
        }
    }

    #[test]
    fn unknown_kind_is_ignored_not_malformed() {
        let raw = br#"{"kind":"telemetry","payload":{"x":1}}"#;
        match parse_inbound(raw) {
            Some(Inbound::Unknown { kind }) => assert_eq!(kind, "telemetry"),
            other => panic!("expected unknown, got {other:?}"),
        }
    }

    #[test]
    fn malformed_envelopes_are_none() {
        assert!(parse_inbound(b"not json").is_none());
        assert!(parse_inbound(br#"{"payload":{}}"#).is_none());
        assert!(parse_inbound(br#"{"kind":"event"}"#).is_none());
        assert!(parse_inbound(br#"[1,2,3]"#).is_none());
    }
}
