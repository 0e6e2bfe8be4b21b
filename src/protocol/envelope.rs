//! Message envelopes - the type tag, request id, and result code wrapping
//! every request and response.
//!
//! On the textual wire the envelope members sit alongside the body fields in
//! the root JSON object (`"$type"`, `"requestId"`, `"resultCode"`). On the
//! binary wire they form a fixed header before the body fields: length-prefixed
//! type name, `u32` request id, and for responses the length-prefixed result
//! code name. The result code travels as its symbolic name in both formats,
//! same as any other enum.
//!
//! Response decoding is two-stage. [`peek_response_json`] /
//! [`peek_response_binary`] parse only the header; a failure there means the
//! frame cannot even be attributed to a request and surfaces as an error.
//! Once the header is known, [`decode_response_body_json`] /
//! [`decode_response_body_binary`] never fail: an unresolvable type tag or a
//! body parse error degrades to a synthesized failure [`Response`] carrying
//! the original request id, so the waiting caller is always released.

use bytes::Bytes;
use serde_json::Value;
use tracing::debug;

use crate::codec::{binary, json};
use crate::error::{Result, WireError};
use crate::meta::{TypeRegistry, WireEnum, WireStruct};
use crate::protocol::wire::{WireReader, WireWriter};

/// JSON member carrying the message type name.
pub const TAG_FIELD: &str = "$type";
/// JSON member carrying the correlation id.
pub const REQUEST_ID_FIELD: &str = "requestId";
/// JSON member carrying the outcome of a request.
pub const RESULT_CODE_FIELD: &str = "resultCode";

crate::wire_enum! {
    /// Outcome of one request, as reported by the peer or synthesized
    /// locally when the exchange failed before a real response arrived.
    pub enum ResultCode {
        Success = 0,
        MalformedParameters = 1,
        MalformedResponse = 2,
        UnknownType = 3,
        Timeout = 4,
        Canceled = 5,
        UnknownClient = 6,
        TransportFailure = 7,
    }
}

/// One completed exchange: the correlation id, the outcome, and the decoded
/// body when the outcome carried one.
#[derive(Debug)]
pub struct Response {
    pub request_id: u32,
    pub result: ResultCode,
    pub payload: Option<Box<dyn WireStruct>>,
}

impl Response {
    /// A locally synthesized response with no body.
    pub fn synthetic(request_id: u32, result: ResultCode) -> Self {
        Self {
            request_id,
            result,
            payload: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result == ResultCode::Success
    }

    /// Downcast the body to a concrete struct type.
    pub fn payload_as<T: 'static>(&self) -> Option<&T> {
        self.payload
            .as_ref()
            .and_then(|p| p.as_any().downcast_ref::<T>())
    }
}

/// Envelope header extracted before the body is touched.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseHead {
    pub request_id: u32,
    pub type_name: String,
    /// Absent on the textual wire when the peer omitted the member; treated
    /// as [`ResultCode::Success`].
    pub result: Option<ResultCode>,
}

/// Encode a request as JSON text: the body object plus envelope members.
pub fn encode_request_json(request_id: u32, body: &mut dyn WireStruct) -> Result<String> {
    let type_name = body.descriptor().name;
    let mut root = json::to_json_value(body)?;
    let object = root
        .as_object_mut()
        .ok_or_else(|| WireError::Malformed("request body did not encode to an object".into()))?;
    object.insert(TAG_FIELD.to_string(), Value::from(type_name));
    object.insert(REQUEST_ID_FIELD.to_string(), Value::from(request_id));
    Ok(serde_json::to_string(&root)?)
}

/// Encode a request in binary form: header then body fields.
pub fn encode_request_binary(request_id: u32, body: &mut dyn WireStruct) -> Result<Bytes> {
    let mut writer = WireWriter::new();
    writer.put_string(body.descriptor().name)?;
    writer.put_u32(request_id);
    binary::encode_into(body, &mut writer)?;
    Ok(writer.finish())
}

/// Encode a response as JSON text. Exercised by tests standing in for the
/// remote peer.
pub fn encode_response_json(
    request_id: u32,
    result: ResultCode,
    body: &mut dyn WireStruct,
) -> Result<String> {
    let type_name = body.descriptor().name;
    let mut root = json::to_json_value(body)?;
    let object = root
        .as_object_mut()
        .ok_or_else(|| WireError::Malformed("response body did not encode to an object".into()))?;
    object.insert(TAG_FIELD.to_string(), Value::from(type_name));
    object.insert(REQUEST_ID_FIELD.to_string(), Value::from(request_id));
    object.insert(RESULT_CODE_FIELD.to_string(), Value::from(result.name()));
    Ok(serde_json::to_string(&root)?)
}

/// Encode a response in binary form. Exercised by tests standing in for the
/// remote peer.
pub fn encode_response_binary(
    request_id: u32,
    result: ResultCode,
    body: &mut dyn WireStruct,
) -> Result<Bytes> {
    let mut writer = WireWriter::new();
    writer.put_string(body.descriptor().name)?;
    writer.put_u32(request_id);
    writer.put_string(result.name())?;
    binary::encode_into(body, &mut writer)?;
    Ok(writer.finish())
}

/// Parse the envelope header of a JSON response frame.
///
/// Returns the head and the parsed tree so the body is not re-parsed.
pub fn peek_response_json(text: &str) -> Result<(ResponseHead, Value)> {
    let root: Value = serde_json::from_str(text)?;
    let object = root
        .as_object()
        .ok_or_else(|| WireError::Malformed("response frame is not a JSON object".into()))?;

    let type_name = object
        .get(TAG_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| WireError::MissingField(TAG_FIELD.to_string()))?
        .to_string();
    let request_id = object
        .get(REQUEST_ID_FIELD)
        .and_then(Value::as_u64)
        .and_then(|id| u32::try_from(id).ok())
        .ok_or_else(|| WireError::MissingField(REQUEST_ID_FIELD.to_string()))?;

    let result = match object.get(RESULT_CODE_FIELD) {
        None => None,
        Some(node) => Some(parse_result_code(node)?),
    };

    let head = ResponseHead {
        request_id,
        type_name,
        result,
    };
    Ok((head, root))
}

/// Parse the envelope header of a binary response frame.
///
/// Returns the head and the byte offset where the body fields begin.
pub fn peek_response_binary(bytes: &[u8]) -> Result<(ResponseHead, usize)> {
    let mut reader = WireReader::new(bytes);
    let type_name = reader.read_string()?;
    let request_id = reader.read_u32()?;
    let code = reader.read_string()?;
    let result = ResultCode::from_name(&code)
        .ok_or_else(|| WireError::Malformed(format!("unknown result code {code:?}")))?;

    let head = ResponseHead {
        request_id,
        type_name,
        result: Some(result),
    };
    Ok((head, reader.position()))
}

/// Decode the body of a JSON response whose header already parsed.
///
/// Never fails: decode problems degrade to a synthesized failure response
/// carrying the original request id.
pub fn decode_response_body_json(
    registry: &TypeRegistry,
    head: &ResponseHead,
    root: &Value,
) -> Response {
    let result = head.result.unwrap_or(ResultCode::Success);
    let Some(descriptor) = registry.resolve_by_name(&head.type_name) else {
        debug!(
            type_name = %head.type_name,
            request_id = head.request_id,
            "response type not registered"
        );
        return Response::synthetic(head.request_id, ResultCode::UnknownType);
    };

    let mut body = (descriptor.allocate)();
    match json::from_json_value(registry, root, body.as_mut()) {
        Ok(()) => Response {
            request_id: head.request_id,
            result,
            payload: Some(body),
        },
        Err(err) => {
            debug!(
                type_name = %head.type_name,
                request_id = head.request_id,
                error = %err,
                "response body failed to decode"
            );
            Response::synthetic(head.request_id, ResultCode::MalformedResponse)
        }
    }
}

/// Decode the body of a binary response whose header already parsed.
///
/// Never fails: decode problems degrade to a synthesized failure response
/// carrying the original request id.
pub fn decode_response_body_binary(
    registry: &TypeRegistry,
    head: &ResponseHead,
    bytes: &[u8],
    body_offset: usize,
) -> Response {
    let result = head.result.unwrap_or(ResultCode::Success);
    let Some(descriptor) = registry.resolve_by_name(&head.type_name) else {
        debug!(
            type_name = %head.type_name,
            request_id = head.request_id,
            "response type not registered"
        );
        return Response::synthetic(head.request_id, ResultCode::UnknownType);
    };

    let mut body = (descriptor.allocate)();
    let mut reader = WireReader::new(&bytes[body_offset..]);
    match binary::decode_from(registry, &mut reader, body.as_mut()) {
        Ok(()) => Response {
            request_id: head.request_id,
            result,
            payload: Some(body),
        },
        Err(err) => {
            debug!(
                type_name = %head.type_name,
                request_id = head.request_id,
                error = %err,
                "response body failed to decode"
            );
            Response::synthetic(head.request_id, ResultCode::MalformedResponse)
        }
    }
}

/// Result codes decode by integer value first, then by symbolic name.
fn parse_result_code(node: &Value) -> Result<ResultCode> {
    if let Some(value) = node.as_i64() {
        let narrow = i32::try_from(value).unwrap_or(i32::MIN);
        if let Some(code) = ResultCode::from_value(narrow) {
            return Ok(code);
        }
    } else if let Some(name) = node.as_str() {
        if let Some(code) = ResultCode::from_name(name) {
            return Ok(code);
        }
    }
    Err(WireError::Malformed(format!(
        "unknown result code {node}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    crate::wire_struct! {
        pub struct Ping: 0x6001 {
            sequence: i32,
        }
    }

    crate::wire_struct! {
        pub struct Pong: 0x6002 {
            sequence: i32,
            note: String,
        }
    }

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.register(Ping::descriptor());
        registry.register(Pong::descriptor());
        registry
    }

    #[test]
    fn test_request_json_carries_envelope_members() {
        let mut ping = Ping { sequence: 3 };
        let text = encode_request_json(9, &mut ping).expect("encode");
        let root: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(root[TAG_FIELD], json!("Ping"));
        assert_eq!(root[REQUEST_ID_FIELD], json!(9));
        assert_eq!(root["sequence"], json!(3));
        assert!(root.get(RESULT_CODE_FIELD).is_none());
    }

    #[test]
    fn test_json_response_round_trip() {
        let registry = registry();
        let mut pong = Pong {
            sequence: 42,
            note: "ok".to_string(),
        };
        let text = encode_response_json(42, ResultCode::Success, &mut pong).expect("encode");

        let (head, root) = peek_response_json(&text).expect("peek");
        assert_eq!(head.request_id, 42);
        assert_eq!(head.type_name, "Pong");
        assert_eq!(head.result, Some(ResultCode::Success));

        let response = decode_response_body_json(&registry, &head, &root);
        assert!(response.is_success());
        let body = response.payload_as::<Pong>().expect("Pong payload");
        assert_eq!(body.sequence, 42);
        assert_eq!(body.note, "ok");
    }

    #[test]
    fn test_binary_response_round_trip() {
        let registry = registry();
        let mut pong = Pong {
            sequence: 42,
            note: "ok".to_string(),
        };
        let bytes = encode_response_binary(42, ResultCode::Success, &mut pong).expect("encode");

        let (head, offset) = peek_response_binary(&bytes).expect("peek");
        assert_eq!(head.request_id, 42);
        assert_eq!(head.type_name, "Pong");
        assert_eq!(head.result, Some(ResultCode::Success));

        let response = decode_response_body_binary(&registry, &head, &bytes, offset);
        assert!(response.is_success());
        assert_eq!(response.payload_as::<Pong>().unwrap().sequence, 42);
    }

    #[test]
    fn test_unregistered_type_degrades_to_unknown_type() {
        let registry = TypeRegistry::new();
        let mut pong = Pong::default();
        let text = encode_response_json(7, ResultCode::Success, &mut pong).expect("encode");

        let (head, root) = peek_response_json(&text).expect("peek");
        let response = decode_response_body_json(&registry, &head, &root);
        assert_eq!(response.request_id, 7);
        assert_eq!(response.result, ResultCode::UnknownType);
        assert!(response.payload.is_none());
    }

    #[test]
    fn test_body_decode_failure_degrades_to_malformed_response() {
        let registry = registry();
        let text = serde_json::to_string(&json!({
            TAG_FIELD: "Pong",
            REQUEST_ID_FIELD: 11,
            RESULT_CODE_FIELD: "Success",
            "sequence": "not a number",
            "note": "x",
        }))
        .unwrap();

        let (head, root) = peek_response_json(&text).expect("peek");
        let response = decode_response_body_json(&registry, &head, &root);
        assert_eq!(response.request_id, 11);
        assert_eq!(response.result, ResultCode::MalformedResponse);
    }

    #[test]
    fn test_headerless_frame_fails_the_peek() {
        assert!(matches!(
            peek_response_json(r#"{"sequence": 1}"#).unwrap_err(),
            WireError::MissingField(_)
        ));
        assert!(matches!(
            peek_response_json("not json at all").unwrap_err(),
            WireError::Json(_)
        ));
        assert!(matches!(
            peek_response_binary(&[1, 2]).unwrap_err(),
            WireError::Underrun { .. }
        ));
    }

    #[test]
    fn test_result_code_parses_by_value_and_by_name() {
        assert_eq!(
            parse_result_code(&json!(4)).unwrap(),
            ResultCode::Timeout
        );
        assert_eq!(
            parse_result_code(&json!("Canceled")).unwrap(),
            ResultCode::Canceled
        );
        assert!(parse_result_code(&json!("NotACode")).is_err());
        assert!(parse_result_code(&json!(99)).is_err());
    }

    #[test]
    fn test_missing_result_code_defaults_to_success() {
        let registry = registry();
        let text = serde_json::to_string(&json!({
            TAG_FIELD: "Ping",
            REQUEST_ID_FIELD: 5,
            "sequence": 1,
        }))
        .unwrap();

        let (head, root) = peek_response_json(&text).expect("peek");
        assert_eq!(head.result, None);
        let response = decode_response_body_json(&registry, &head, &root);
        assert!(response.is_success());
    }
}
