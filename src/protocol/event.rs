//! Unsolicited peer events.
//!
//! Besides responses, the peer pushes text frames that correlate to no
//! request: typed notification messages and the legacy plain-text disconnect
//! line. [`parse_text_event`] classifies one such frame.
//!
//! The disconnect line predates the typed envelope and is matched before any
//! JSON parsing: `disconnect:<code>:<reason>`, where the reason may itself
//! contain colons.

use serde_json::Value;
use tracing::warn;

use crate::codec::json;
use crate::meta::{TypeRegistry, WireStruct};
use crate::protocol::envelope::TAG_FIELD;

const DISCONNECT_PREFIX: &str = "disconnect:";

/// One unsolicited frame, classified.
#[derive(Debug)]
pub enum Event {
    /// Typed notification pushed by the peer, decoded like a response
    /// payload but with no request identifier.
    Message {
        type_name: String,
        body: Box<dyn WireStruct>,
    },

    /// The peer announced it is closing the session.
    Disconnected { code: i32, reason: String },
}

/// Classify an unsolicited text frame.
///
/// Returns `None` for frames that are neither a disconnect line nor a
/// decodable typed message; peers may run a newer protocol version, so
/// unknown type tags are logged and dropped, never fatal.
pub fn parse_text_event(registry: &TypeRegistry, text: &str) -> Option<Event> {
    if let Some(rest) = text.strip_prefix(DISCONNECT_PREFIX) {
        return Some(parse_disconnect(rest));
    }

    let root: Value = match serde_json::from_str(text) {
        Ok(root) => root,
        Err(err) => {
            warn!(error = %err, "dropping unparseable event frame");
            return None;
        }
    };

    let Some(type_name) = root.get(TAG_FIELD).and_then(Value::as_str) else {
        warn!("dropping event frame without a type tag");
        return None;
    };
    let type_name = type_name.to_string();

    let Some(descriptor) = registry.resolve_by_name(&type_name) else {
        warn!(type_name = %type_name, "dropping event of unregistered type");
        return None;
    };

    let mut body = (descriptor.allocate)();
    if let Err(err) = json::from_json_value(registry, &root, body.as_mut()) {
        warn!(type_name = %type_name, error = %err, "dropping event with undecodable body");
        return None;
    }

    Some(Event::Message { type_name, body })
}

/// The part after `disconnect:` is `<code>:<reason>`; a missing or
/// non-numeric code maps to 0 with the whole remainder as reason.
fn parse_disconnect(rest: &str) -> Event {
    match rest.split_once(':') {
        Some((code, reason)) => match code.parse::<i32>() {
            Ok(code) => Event::Disconnected {
                code,
                reason: reason.to_string(),
            },
            Err(_) => Event::Disconnected {
                code: 0,
                reason: rest.to_string(),
            },
        },
        None => Event::Disconnected {
            code: rest.parse::<i32>().unwrap_or(0),
            reason: String::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::wire_struct! {
        pub struct FrameReady: 0x6101 {
            frame: u64,
        }
    }

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.register(FrameReady::descriptor());
        registry
    }

    #[test]
    fn test_disconnect_line_parses_before_json() {
        let registry = registry();
        let event = parse_text_event(&registry, "disconnect:410:session replaced").unwrap();
        match event {
            Event::Disconnected { code, reason } => {
                assert_eq!(code, 410);
                assert_eq!(reason, "session replaced");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_disconnect_reason_may_contain_colons() {
        let registry = registry();
        let event = parse_text_event(&registry, "disconnect:1:peer said: goodbye").unwrap();
        match event {
            Event::Disconnected { code, reason } => {
                assert_eq!(code, 1);
                assert_eq!(reason, "peer said: goodbye");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_typed_message_decodes_body() {
        let registry = registry();
        let event =
            parse_text_event(&registry, r#"{"$type": "FrameReady", "frame": 120}"#).unwrap();
        match event {
            Event::Message { type_name, body } => {
                assert_eq!(type_name, "FrameReady");
                let frame = body.as_any().downcast_ref::<FrameReady>().unwrap();
                assert_eq!(frame.frame, 120);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_unregistered_message_is_dropped() {
        let registry = registry();
        assert!(parse_text_event(&registry, r#"{"$type": "Unheard", "x": 1}"#).is_none());
    }

    #[test]
    fn test_undecodable_body_is_dropped() {
        let registry = registry();
        let text = r#"{"$type": "FrameReady", "frame": "not a number"}"#;
        assert!(parse_text_event(&registry, text).is_none());
    }

    #[test]
    fn test_garbage_frames_are_dropped() {
        let registry = registry();
        assert!(parse_text_event(&registry, "not json").is_none());
        assert!(parse_text_event(&registry, r#"{"no": "tag"}"#).is_none());
        assert!(parse_text_event(&registry, "[1, 2, 3]").is_none());
    }
}
