//! Unit tests for argument schemas.

use rstest::{fixture, rstest};
use serde::Deserialize;

use super::*;

#[fixture]
fn file_schema() -> ArgumentSchema {
    ArgumentSchema::new()
        .with(Argument::string("dir", "the directory of the file").required())
        .with(Argument::string("name", "the name of the file").required())
        .with(Argument::new("lines", ArgumentType::Integer, "line limit"))
        .with(Argument::string("mode", "read mode").allowed(["text", "base64"]))
}

#[test]
fn empty_schema_accepts_anything() {
    let schema = ArgumentSchema::new();
    assert!(schema.validate("not json at all").is_ok());
    assert!(schema.validate("").is_ok());
}

#[rstest]
#[case::minimal(r#"{"dir":"x","name":"y.txt"}"#)]
#[case::with_optional(r#"{"dir":"x","name":"y.txt","lines":10}"#)]
#[case::allowed_value(r#"{"dir":"x","name":"y.txt","mode":"base64"}"#)]
#[case::multiline("{\n  \"dir\": \"x\",\n  \"name\": \"y.txt\"\n}")]
fn valid_payloads_pass(file_schema: ArgumentSchema, #[case] payload: &str) {
    assert_eq!(file_schema.validate(payload), Ok(()));
}

#[rstest]
#[case::missing_required(r#"{"dir":"x"}"#, "missing required argument 'name'")]
#[case::wrong_type(r#"{"dir":"x","name":7}"#, "argument 'name' must be of type string")]
#[case::fractional_integer(
    r#"{"dir":"x","name":"y","lines":1.5}"#,
    "argument 'lines' must be of type integer"
)]
#[case::disallowed(r#"{"dir":"x","name":"y","mode":"hex"}"#, "must be one of [text, base64]")]
#[case::unknown_field(r#"{"dir":"x","name":"y","extra":true}"#, "unexpected argument 'extra'")]
#[case::not_object("[1,2]", "payload must be a JSON object, got array")]
#[case::not_json("{dir:", "payload is not JSON")]
#[case::blank("", "missing required argument 'dir'")]
fn invalid_payloads_are_described(
    file_schema: ArgumentSchema,
    #[case] payload: &str,
    #[case] expected: &str,
) {
    let error = file_schema
        .validate(payload)
        .expect_err("payload should be rejected");
    assert!(
        error.contains(expected),
        "expected '{expected}' in '{error}'"
    );
}

#[rstest]
fn required_names_follow_declaration_order(file_schema: ArgumentSchema) {
    assert_eq!(file_schema.required_names(), vec!["dir", "name"]);
}

#[test]
fn argument_serialises_with_enum_and_type_keys() {
    let argument = Argument::string("mode", "read mode")
        .allowed(["text"])
        .required();
    let json = serde_json::to_value(&argument).expect("serialise");
    assert_eq!(
        json,
        serde_json::json!({
            "name": "mode",
            "type": "string",
            "description": "read mode",
            "enum": ["text"],
            "required": true,
        })
    );
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
struct ReadRequest {
    dir: String,
    name: String,
}

#[test]
fn parse_payload_decodes_typed_request() {
    let request: ReadRequest =
        parse_payload(r#"{"dir":"x","name":"y.txt"}"#).expect("payload should decode");
    assert_eq!(
        request,
        ReadRequest {
            dir: "x".into(),
            name: "y.txt".into()
        }
    );
}

#[test]
fn parse_payload_reports_invalid_arguments() {
    let error = parse_payload::<ReadRequest>(r#"{"dir":"x"}"#).expect_err("missing field");
    assert!(matches!(error, HandlerError::InvalidArguments { .. }));
}
