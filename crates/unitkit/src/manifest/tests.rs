//! Unit tests for manifest projection and encoding.

use rstest::{fixture, rstest};
use serde_json::{Value, json};

use super::*;
use crate::error::HandlerError;
use crate::operation::{ActionResponse, OperationDescriptor};
use crate::schema::{Argument, ArgumentType};

fn echo(payload: &str) -> Result<String, HandlerError> {
    Ok(payload.to_owned())
}

fn identity() -> Identity {
    Identity {
        id: "file-tools".into(),
        name: "File Tools".into(),
        description: "Reads and writes files".into(),
    }
}

fn compound_layout() -> Layout {
    Layout::Compound { cards: Vec::new() }
}

fn to_json(manifest: &Manifest) -> Value {
    let text = manifest.encode(ManifestFormat::Json).expect("encode");
    serde_json::from_str(&text).expect("valid json")
}

#[fixture]
fn populated() -> Registry {
    let mut registry = Registry::new("file-tools");
    registry
        .register(
            OperationDescriptor::action("Read File", echo)
                .with_description("Reads a file")
                .with_argument(Argument::string("dir", "directory").required())
                .with_argument(
                    Argument::new("mode", ArgumentType::String, "how to read")
                        .allowed(["text", "base64"]),
                ),
        )
        .expect("register");
    registry
        .register(OperationDescriptor::cron("Hourly Sync", "0 * * * *", |_: &str| {
            Ok(ActionResponse::default())
        }))
        .expect("register");
    registry
        .register(OperationDescriptor::command("Refresh", |_: &str| Ok(())))
        .expect("register");
    registry
}

// ---------------------------------------------------------------------------
// Compound layout
// ---------------------------------------------------------------------------

#[rstest]
fn empty_registry_yields_identity_only() {
    let manifest = Manifest::build(&Registry::new("file-tools"), &identity(), &compound_layout());
    assert_eq!(
        to_json(&manifest),
        json!({
            "id": "file-tools",
            "name": "File Tools",
            "description": "Reads and writes files"
        })
    );
}

#[rstest]
fn compound_manifest_partitions_operations(populated: Registry) {
    let manifest = Manifest::build(&populated, &identity(), &compound_layout());
    let value = to_json(&manifest);

    assert_eq!(
        value["actions"]["read-file"],
        json!({
            "id": "read-file",
            "index": 0,
            "name": "Read File",
            "description": "Reads a file",
            "kind": "action"
        })
    );
    assert_eq!(value["actions"]["hourly-sync"]["index"], json!(-1));
    assert_eq!(value["actions"]["hourly-sync"]["cron"], json!("0 * * * *"));
    assert_eq!(
        value["actions"]["hourly-sync"]["cronSummary"],
        json!("every hour at minute 0")
    );
    assert_eq!(value["commands"], json!({"refresh": {"id": "refresh"}}));
    assert!(value.get("cards").is_none());
}

#[test]
fn malformed_cron_degrades_to_raw_expression() {
    let mut registry = Registry::new("u");
    registry
        .register(OperationDescriptor::cron("Broken", "every full moon", |_: &str| {
            Ok(ActionResponse::default())
        }))
        .expect("register");
    let value = to_json(&Manifest::build(&registry, &identity(), &compound_layout()));
    assert_eq!(
        value["actions"]["broken"]["cronSummary"],
        json!("every full moon")
    );
}

#[test]
fn cards_keep_insertion_order() {
    let layout = Layout::Compound {
        cards: vec![Card::custom("b", "<b/>"), Card::custom("a", "<a/>")],
    };
    let value = to_json(&Manifest::build(&Registry::new("u"), &identity(), &layout));
    assert_eq!(
        value["cards"],
        json!([{"id": "b", "html": "<b/>"}, {"id": "a", "html": "<a/>"}])
    );
}

#[rstest]
fn building_is_idempotent(populated: Registry) {
    let first = Manifest::build(&populated, &identity(), &compound_layout());
    let second = Manifest::build(&populated, &identity(), &compound_layout());
    assert_eq!(first, second);
    assert_eq!(
        first.encode(ManifestFormat::Json).expect("encode"),
        second.encode(ManifestFormat::Json).expect("encode")
    );
}

// ---------------------------------------------------------------------------
// Simple layout
// ---------------------------------------------------------------------------

#[rstest]
fn simple_manifest_lists_tools(populated: Registry) {
    let profile = AssistantProfile {
        model: "gpt-4".into(),
        placeholder: "How can I help you?".into(),
        quicklinks: vec![Quicklink {
            title: "List".into(),
            content: "list my files".into(),
        }],
        ..AssistantProfile::default()
    };
    let value = to_json(&Manifest::build(
        &populated,
        &identity(),
        &Layout::Simple(profile),
    ));

    assert_eq!(value["model"], json!("gpt-4"));
    assert!(value.get("instructions").is_none());
    assert_eq!(
        value["quicklinks"],
        json!([{"title": "List", "content": "list my files"}])
    );
    assert_eq!(
        value["tools"][0],
        json!({
            "type": "function",
            "function": {
                "name": "read-file",
                "description": "Reads a file",
                "parameters": {
                    "type": "object",
                    "required": ["dir"],
                    "properties": {
                        "dir": {"type": "string", "description": "directory"},
                        "mode": {
                            "type": "string",
                            "description": "how to read",
                            "enum": ["text", "base64"]
                        }
                    }
                }
            }
        })
    );
    assert!(value["tools"][1]["function"].get("parameters").is_none());
    assert_eq!(value["tools"].as_array().map(Vec::len), Some(3));
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

#[rstest]
fn yaml_encoding_carries_the_same_fields(populated: Registry) {
    let manifest = Manifest::build(&populated, &identity(), &compound_layout());
    let yaml = manifest.encode(ManifestFormat::Yaml).expect("encode");
    assert!(yaml.contains("id: file-tools"));
    assert!(yaml.contains("cronSummary: every hour at minute 0"));
}

#[test]
fn identity_is_shared_by_layouts() {
    let manifest = Manifest::build(
        &Registry::new("u"),
        &identity(),
        &Layout::Simple(AssistantProfile::default()),
    );
    assert_eq!(manifest.identity(), &identity());
}
