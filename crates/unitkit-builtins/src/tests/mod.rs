//! Crate-level tests driving the built-ins through a unit.

use camino::Utf8PathBuf;
use serde_json::{Value, json};
use tempfile::TempDir;
use unitkit::Unit;

use crate::{FileTools, SafeRoot, files_unit};


fn unit_in(dir: &TempDir) -> Unit {
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 path");
    let tools = FileTools::new(SafeRoot::open(&path).expect("open root"));
    files_unit(&tools).expect("built-ins register")
}

fn send(unit: &Unit, operation: &str, payload: &Value) -> String {
    unit.test(Unit::payload(operation, &payload.to_string()))
}

#[test]
fn describe_lists_builtins_as_tools() {
    let dir = TempDir::new().expect("temp dir");
    let unit = unit_in(&dir);

    let manifest: Value =
        serde_json::from_str(&unit.test(Unit::payload("describe", ""))).expect("manifest json");
    assert_eq!(manifest["id"], "files");
    let names: Vec<&str> = manifest["tools"]
        .as_array()
        .expect("tools array")
        .iter()
        .filter_map(|tool| tool["function"]["name"].as_str())
        .collect();
    assert_eq!(
        names,
        ["read-file", "save-file", "copy-file", "list-directories", "build"]
    );
    assert_eq!(
        manifest["tools"][4]["function"]["parameters"]["required"],
        json!(["workingDir", "outputName"])
    );
    assert!(manifest["tools"][3]["function"].get("parameters").is_none());
}

#[test]
fn save_and_read_through_the_protocol() {
    let dir = TempDir::new().expect("temp dir");
    let unit = unit_in(&dir);

    let saved = send(
        &unit,
        "save-file",
        &json!({"dir": "docs", "name": "readme.md", "content": "# Hello"}),
    );
    assert_eq!(saved, "file saved successfully");
    assert_eq!(
        std::fs::read_to_string(dir.path().join("docs/readme.md")).expect("file on disk"),
        "# Hello"
    );

    let read = send(&unit, "read-file", &json!({"dir": "docs", "name": "readme.md"}));
    assert_eq!(read, "# Hello");
}

#[test]
fn missing_arguments_are_rejected_before_the_handler() {
    let dir = TempDir::new().expect("temp dir");
    let unit = unit_in(&dir);

    let output = send(&unit, "save-file", &json!({"dir": "docs", "name": "a.txt"}));
    assert_eq!(
        output,
        "invalid arguments for 'save-file': missing required argument 'content'"
    );
    assert!(!dir.path().join("docs").exists());
}
