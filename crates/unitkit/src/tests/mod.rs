//! Crate-level integration and BDD tests.

use mockall::mock;
use serde_json::{Value, json};

use crate::codec::encode_request;
use crate::error::HandlerError;
use crate::operation::{ActionResponse, Handler, OperationDescriptor};
use crate::schema::Argument;
use crate::unit::Unit;


mock! {
    pub FileReader {}
    impl Handler for FileReader {
        fn handle(&self, payload: &str) -> Result<String, HandlerError>;
    }
}

fn read_file_descriptor(handler: MockFileReader) -> OperationDescriptor {
    OperationDescriptor::action("read-file", handler)
        .with_argument(Argument::string("dir", "directory").required())
        .with_argument(Argument::string("name", "file name").required())
}

#[test]
fn end_to_end_read_file_output_is_verbatim() {
    let mut handler = MockFileReader::new();
    handler
        .expect_handle()
        .withf(|payload: &str| payload == r#"{"dir":"x","name":"y.txt"}"#)
        .times(1)
        .returning(|_| Ok("file contents\nwith two lines".to_owned()));

    let mut unit = Unit::compound("Files", "");
    unit.register(read_file_descriptor(handler))
        .expect("register");

    let output = unit.test("read-file\n---\n{\"dir\":\"x\",\"name\":\"y.txt\"}\n".as_bytes());
    assert_eq!(output, "file contents\nwith two lines");
}

#[test]
fn end_to_end_describe_summarises_cron() {
    let mut unit = Unit::compound("Files", "");
    unit.add_cron("Sweep", "0 * * * *", |_: &str| Ok(ActionResponse::default()))
        .expect("register");

    let output = unit.test("describe\n---\n\n".as_bytes());
    let manifest: Value = serde_json::from_str(&output).expect("json");
    let summary = manifest["actions"]["sweep"]["cronSummary"]
        .as_str()
        .expect("summary present");
    assert!(!summary.is_empty());
    assert_eq!(manifest["actions"]["sweep"]["cron"], json!("0 * * * *"));
}

#[test]
fn invalid_arguments_never_reach_the_handler() {
    let mut handler = MockFileReader::new();
    handler.expect_handle().times(0);
    let mut unit = Unit::compound("Files", "");
    unit.register(read_file_descriptor(handler))
        .expect("register");

    let output = unit.test(encode_request("read-file", r#"{"dir":"x"}"#).as_bytes());
    assert_eq!(
        output,
        "invalid arguments for 'read-file': missing required argument 'name'"
    );
}
