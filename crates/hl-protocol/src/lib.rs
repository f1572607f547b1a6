//! Wire types and schema validation for the tokenization protocol.
//!
//! Request and response messages travel as a two-element JSON array:
//! `[msg_num, { ...body... }]`. The body shape differs by `version` only
//! in the JSON type of `id` (integer for `v1`, string for `v1.1`) — see
//! `schema` for the embedded JSON-schema documents that enforce this.

mod schema;

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The two wire-protocol versions this server accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
    V1,
    V11,
}

impl ProtocolVersion {
    pub fn as_wire_str(self) -> &'static str {
        match self {
            ProtocolVersion::V1 => "v1",
            ProtocolVersion::V11 => "v1.1",
        }
    }

    fn from_wire_str(s: &str) -> Option<Self> {
        match s {
            "v1" => Some(ProtocolVersion::V1),
            "v1.1" => Some(ProtocolVersion::V11),
            _ => None,
        }
    }
}

impl Default for ProtocolVersion {
    /// The default on decode failure, per the "bad message" response contract.
    fn default() -> Self {
        ProtocolVersion::V11
    }
}

/// The client-supplied correlation id. Its JSON representation is fixed
/// by `version`: `V1` carries an integer, `V11` carries a string. The
/// codec never produces a mismatched pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageId {
    Int(i64),
    Text(String),
}

impl Default for MessageId {
    fn default() -> Self {
        MessageId::Text(String::new())
    }
}

/// One token produced by a tokenizer: a semantic group label plus its
/// 1-indexed location in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLocation {
    pub row: u64,
    pub column: u64,
    pub length: u64,
}

impl TokenLocation {
    pub fn new(row: u64, column: u64, length: u64) -> Self {
        Self { row, column, length }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub group: String,
    pub location: TokenLocation,
}

impl Token {
    pub fn new(group: impl Into<String>, location: TokenLocation) -> Self {
        Self { group: group.into(), location }
    }
}

/// A decoded request, ready for dispatch to a tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMessage {
    pub msg_num: i64,
    pub version: ProtocolVersion,
    pub id: MessageId,
    pub buf_type: String,
    pub buf_name: String,
    pub buf_body: String,
    pub additional_info: String,
}

/// A response, mirroring the identifying fields of the request that
/// produced it plus the tokenization result (or failure).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponseMessage {
    pub msg_num: i64,
    pub version: ProtocolVersion,
    pub id: MessageId,
    pub buf_type: String,
    pub buf_name: String,
    pub return_code: i32,
    pub error_message: String,
    pub tokens: Vec<Token>,
}

impl ResponseMessage {
    /// Build the canned "bad message" response used when decoding fails
    /// before any request fields — not even `version` — are known.
    pub fn decode_failure(error_message: impl Into<String>) -> Self {
        Self {
            msg_num: 0,
            version: ProtocolVersion::V11,
            id: MessageId::Text(String::new()),
            buf_type: String::new(),
            buf_name: String::new(),
            return_code: 1,
            error_message: error_message.into(),
            tokens: Vec::new(),
        }
    }

    /// Build a failure response that echoes the request's identifying
    /// fields — used once the request decoded but dispatch failed
    /// (unknown `buf_type`, tokenizer error).
    pub fn echo_failure(request: &RequestMessage, error_message: impl Into<String>) -> Self {
        Self {
            msg_num: request.msg_num,
            version: request.version,
            id: request.id.clone(),
            buf_type: request.buf_type.clone(),
            buf_name: request.buf_name.clone(),
            return_code: 1,
            error_message: error_message.into(),
            tokens: Vec::new(),
        }
    }

    pub fn success(request: &RequestMessage, tokens: Vec<Token>) -> Self {
        Self {
            msg_num: request.msg_num,
            version: request.version,
            id: request.id.clone(),
            buf_type: request.buf_type.clone(),
            buf_name: request.buf_name.clone(),
            return_code: 0,
            error_message: String::new(),
            tokens,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("request doesn't contain a json document: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("request failed schema validation: {0}")]
    SchemaViolation(String),
}

/// Lazily-compiled validators, one per schema document. Compiling a
/// `jsonschema` validator is not free, so this happens once per process
/// rather than once per request.
struct Validators {
    base: jsonschema::Validator,
    request_v1: jsonschema::Validator,
    request_v11: jsonschema::Validator,
    response_v1: jsonschema::Validator,
    response_v11: jsonschema::Validator,
}

fn compile(schema_src: &str) -> jsonschema::Validator {
    let schema: Value = serde_json::from_str(schema_src).expect("embedded schema is valid JSON");
    jsonschema::validator_for(&schema).expect("embedded schema compiles")
}

static VALIDATORS: LazyLock<Validators> = LazyLock::new(|| Validators {
    base: compile(schema::BASE_SCHEMA),
    request_v1: compile(schema::REQUEST_SCHEMA_V1),
    request_v11: compile(schema::REQUEST_SCHEMA_V11),
    response_v1: compile(schema::RESPONSE_SCHEMA_V1),
    response_v11: compile(schema::RESPONSE_SCHEMA_V11),
});

/// Decode and validate one complete JSON document (no trailing
/// delimiter) into a [`RequestMessage`].
///
/// Two validation passes, matching the original server's two embedded
/// schema documents: a base pass that only pins down `version`, then a
/// version-specific pass that pins down the type of `id` and the
/// presence of the other fields.
pub fn decode_request(document: &[u8]) -> Result<RequestMessage, CodecError> {
    let value: Value = serde_json::from_slice(document)?;

    if let Err(e) = VALIDATORS.base.validate(&value) {
        return Err(CodecError::SchemaViolation(e.to_string()));
    }

    let version_str = value[1]["version"]
        .as_str()
        .expect("base schema guarantees body.version is a string");
    let version = ProtocolVersion::from_wire_str(version_str)
        .expect("base schema guarantees version is v1 or v1.1");

    let version_validator = match version {
        ProtocolVersion::V1 => &VALIDATORS.request_v1,
        ProtocolVersion::V11 => &VALIDATORS.request_v11,
    };
    if let Err(e) = version_validator.validate(&value) {
        return Err(CodecError::SchemaViolation(e.to_string()));
    }

    let body = &value[1];
    let id = match version {
        ProtocolVersion::V1 => MessageId::Int(body["id"].as_i64().ok_or_else(|| {
            CodecError::SchemaViolation("id is out of range for a 64-bit integer".into())
        })?),
        ProtocolVersion::V11 => MessageId::Text(
            body["id"]
                .as_str()
                .expect("version-specific schema guarantees id is a string")
                .to_owned(),
        ),
    };

    Ok(RequestMessage {
        msg_num: value[0].as_i64().ok_or_else(|| {
            CodecError::SchemaViolation("msg_num is out of range for a 64-bit integer".into())
        })?,
        version,
        id,
        buf_type: body["buf_type"].as_str().unwrap_or_default().to_owned(),
        buf_name: body["buf_name"].as_str().unwrap_or_default().to_owned(),
        buf_body: body["buf_body"].as_str().unwrap_or_default().to_owned(),
        additional_info: body["additional_info"]
            .as_str()
            .unwrap_or_default()
            .to_owned(),
    })
}

/// Encode `response` and append it to `sink`. Never allocates a fresh
/// buffer — bytes are pushed onto the caller's buffer so the session can
/// reuse its reserved capacity across requests.
///
/// Appends no trailing delimiter; the caller (the request handler) is
/// responsible for writing exactly one delimiter byte after the bytes
/// this function produces.
pub fn encode_response(response: &ResponseMessage, sink: &mut Vec<u8>) {
    let mut tokens = serde_json::Map::new();
    for token in &response.tokens {
        let entry = tokens
            .entry(token.group.clone())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(locations) = entry {
            locations.push(serde_json::json!([
                token.location.row,
                token.location.column,
                token.location.length
            ]));
        }
    }

    let id_value = match (&response.id, response.version) {
        (MessageId::Int(i), _) => Value::from(*i),
        (MessageId::Text(s), ProtocolVersion::V1) => Value::from(
            s.parse::<i64>()
                .unwrap_or_else(|_| panic!("codec invariant violated: v1 id {s:?} is not an integer")),
        ),
        (MessageId::Text(s), ProtocolVersion::V11) => Value::from(s.clone()),
    };

    let document = serde_json::json!([
        response.msg_num,
        {
            "version": response.version.as_wire_str(),
            "id": id_value,
            "buf_type": response.buf_type,
            "buf_name": response.buf_name,
            "return_code": response.return_code,
            "error_message": response.error_message,
            "tokens": tokens,
        }
    ]);

    #[cfg(debug_assertions)]
    {
        let validator = match response.version {
            ProtocolVersion::V1 => &VALIDATORS.response_v1,
            ProtocolVersion::V11 => &VALIDATORS.response_v11,
        };
        if let Err(e) = validator.validate(&document) {
            panic!("encoder produced a response that fails its own schema: {e}");
        }
    }

    serde_json::to_writer(&mut *sink, &document).expect("writing to a Vec<u8> cannot fail");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_v11_request() {
        let req = decode_request(
            br#"[7,{"version":"v1.1","id":"c1","buf_type":"polyndrom","buf_name":"n","buf_body":"abba","additional_info":""}]"#,
        )
        .unwrap();
        assert_eq!(req.msg_num, 7);
        assert_eq!(req.version, ProtocolVersion::V11);
        assert_eq!(req.id, MessageId::Text("c1".to_owned()));
        assert_eq!(req.buf_type, "polyndrom");
    }

    #[test]
    fn decodes_v1_request_with_integer_id() {
        let req = decode_request(
            br#"[1,{"version":"v1","id":42,"buf_type":"cpp","buf_name":"n","buf_body":"","additional_info":""}]"#,
        )
        .unwrap();
        assert_eq!(req.version, ProtocolVersion::V1);
        assert_eq!(req.id, MessageId::Int(42));
    }

    #[test]
    fn rejects_v1_request_with_non_integer_id() {
        let err = decode_request(
            br#"[1,{"version":"v1","id":"not-an-integer","buf_type":"cpp","buf_name":"n","buf_body":"","additional_info":""}]"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn rejects_malformed_json() {
        let err = decode_request(b"not json");
        assert!(matches!(err, Err(CodecError::Malformed(_))));
    }

    #[test]
    fn rejects_unknown_version() {
        let err = decode_request(
            br#"[1,{"version":"v2","id":"x","buf_type":"t","buf_name":"n","buf_body":"","additional_info":""}]"#,
        );
        assert!(matches!(err, Err(CodecError::SchemaViolation(_))));
    }

    #[test]
    fn oversized_msg_num_is_a_decode_failure_not_a_panic() {
        let err = decode_request(
            br#"[99999999999999999999,{"version":"v1.1","id":"x","buf_type":"t","buf_name":"n","buf_body":"","additional_info":""}]"#,
        );
        assert!(matches!(err, Err(CodecError::SchemaViolation(_))));
    }

    #[test]
    fn oversized_v1_id_is_a_decode_failure_not_a_panic() {
        let err = decode_request(
            br#"[1,{"version":"v1","id":99999999999999999999,"buf_type":"t","buf_name":"n","buf_body":"","additional_info":""}]"#,
        );
        assert!(matches!(err, Err(CodecError::SchemaViolation(_))));
    }

    #[test]
    fn round_trips_success_response_v11() {
        let request = RequestMessage {
            msg_num: 7,
            version: ProtocolVersion::V11,
            id: MessageId::Text("c1".to_owned()),
            buf_type: "polyndrom".to_owned(),
            buf_name: "n".to_owned(),
            buf_body: "abba racecar".to_owned(),
            additional_info: String::new(),
        };
        let response = ResponseMessage::success(
            &request,
            vec![
                Token::new("Label", TokenLocation::new(1, 1, 4)),
                Token::new("Label", TokenLocation::new(1, 6, 7)),
            ],
        );
        let mut buf = Vec::new();
        encode_response(&response, &mut buf);
        let value: Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value[0], 7);
        assert_eq!(value[1]["id"], "c1");
        assert_eq!(value[1]["return_code"], 0);
        assert_eq!(value[1]["tokens"]["Label"][0], serde_json::json!([1, 1, 4]));
        assert_eq!(value[1]["tokens"]["Label"][1], serde_json::json!([1, 6, 7]));
    }

    #[test]
    fn encodes_v1_id_as_integer() {
        let request = RequestMessage {
            msg_num: 1,
            version: ProtocolVersion::V1,
            id: MessageId::Int(42),
            buf_type: "t".to_owned(),
            buf_name: "n".to_owned(),
            buf_body: String::new(),
            additional_info: String::new(),
        };
        let response = ResponseMessage::success(&request, Vec::new());
        let mut buf = Vec::new();
        encode_response(&response, &mut buf);
        let value: Value = serde_json::from_slice(&buf).unwrap();
        assert!(value[1]["id"].is_number());
        assert_eq!(value[1]["id"], 42);
    }

    #[test]
    fn decode_failure_has_placeholder_fields() {
        let response = ResponseMessage::decode_failure("bad message");
        assert_eq!(response.msg_num, 0);
        assert_eq!(response.version, ProtocolVersion::V11);
        assert_eq!(response.id, MessageId::Text(String::new()));
        assert_eq!(response.return_code, 1);
    }
}
