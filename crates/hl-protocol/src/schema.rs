//! Embedded JSON-schema documents for the two wire versions.
//!
//! Mirrors the original `hl-server`'s `rr_schemes.h`: one schema per
//! protocol version rather than a single `oneOf` document, because the
//! `id` field's type differs across versions and keeping the branches
//! separate makes the mismatch impossible to express by accident.

/// Matches `[integer, { "version": "v1" | "v1.1", ... }]` without
/// constraining the rest of the object. Used as a first pass so that an
/// unrecognized `version` value is reported the same way regardless of
/// which version-specific schema would otherwise apply.
pub const BASE_SCHEMA: &str = r#"
{
    "type": "array",
    "items": [
        { "type": "integer" },
        {
            "type": "object",
            "required": ["version"],
            "properties": {
                "version": { "type": "string", "enum": ["v1", "v1.1"] }
            }
        }
    ],
    "minItems": 2,
    "maxItems": 2
}
"#;

pub const REQUEST_SCHEMA_V1: &str = r#"
{
    "type": "array",
    "items": [
        { "type": "integer" },
        {
            "type": "object",
            "required": ["version", "id", "buf_type", "buf_name", "buf_body", "additional_info"],
            "properties": {
                "version": { "type": "string", "const": "v1" },
                "id": { "type": "integer" },
                "buf_type": { "type": "string" },
                "buf_name": { "type": "string" },
                "buf_body": { "type": "string" },
                "additional_info": { "type": "string" }
            },
            "additionalProperties": false
        }
    ],
    "minItems": 2,
    "maxItems": 2
}
"#;

pub const REQUEST_SCHEMA_V11: &str = r#"
{
    "type": "array",
    "items": [
        { "type": "integer" },
        {
            "type": "object",
            "required": ["version", "id", "buf_type", "buf_name", "buf_body", "additional_info"],
            "properties": {
                "version": { "type": "string", "const": "v1.1" },
                "id": { "type": "string" },
                "buf_type": { "type": "string" },
                "buf_name": { "type": "string" },
                "buf_body": { "type": "string" },
                "additional_info": { "type": "string" }
            },
            "additionalProperties": false
        }
    ],
    "minItems": 2,
    "maxItems": 2
}
"#;

pub const RESPONSE_SCHEMA_V1: &str = r#"
{
    "type": "array",
    "items": [
        { "type": "integer" },
        {
            "type": "object",
            "required": ["version", "id", "buf_type", "buf_name", "return_code", "error_message", "tokens"],
            "properties": {
                "version": { "type": "string", "const": "v1" },
                "id": { "type": "integer" },
                "buf_type": { "type": "string" },
                "buf_name": { "type": "string" },
                "return_code": { "type": "integer" },
                "error_message": { "type": "string" },
                "tokens": { "$ref": "#/definitions/tokens" }
            },
            "additionalProperties": false
        }
    ],
    "minItems": 2,
    "maxItems": 2,
    "definitions": {
        "tokens": {
            "type": "object",
            "additionalProperties": {
                "type": "array",
                "items": {
                    "type": "array",
                    "items": { "type": "integer" },
                    "minItems": 3,
                    "maxItems": 3
                }
            }
        }
    }
}
"#;

pub const RESPONSE_SCHEMA_V11: &str = r#"
{
    "type": "array",
    "items": [
        { "type": "integer" },
        {
            "type": "object",
            "required": ["version", "id", "buf_type", "buf_name", "return_code", "error_message", "tokens"],
            "properties": {
                "version": { "type": "string", "const": "v1.1" },
                "id": { "type": "string" },
                "buf_type": { "type": "string" },
                "buf_name": { "type": "string" },
                "return_code": { "type": "integer" },
                "error_message": { "type": "string" },
                "tokens": { "$ref": "#/definitions/tokens" }
            },
            "additionalProperties": false
        }
    ],
    "minItems": 2,
    "maxItems": 2,
    "definitions": {
        "tokens": {
            "type": "object",
            "additionalProperties": {
                "type": "array",
                "items": {
                    "type": "array",
                    "items": { "type": "integer" },
                    "minItems": 3,
                    "maxItems": 3
                }
            }
        }
    }
}
"#;
