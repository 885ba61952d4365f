//! Unit tests for the operation registry.

use rstest::{fixture, rstest};

use super::*;
use crate::operation::ActionResponse;
use crate::schema::Argument;

fn echo(payload: &str) -> Result<String, HandlerError> {
    Ok(payload.to_owned())
}

fn constant(value: &'static str) -> impl Fn(&str) -> Result<String, HandlerError> + Send + Sync {
    move |_payload: &str| Ok(value.to_owned())
}

#[fixture]
fn registry() -> Registry {
    Registry::new("file-tools")
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

#[rstest]
fn register_assigns_url_path_and_index(mut registry: Registry) {
    let op = registry
        .register(OperationDescriptor::action("Read File", echo))
        .expect("register");
    assert_eq!(op.id(), "read-file");
    assert_eq!(op.url_path(), "/extension/action/file-tools/read-file");
    assert_eq!(op.index(), Some(0));
}

#[rstest]
fn indices_follow_registration_order_of_ordered_kinds(mut registry: Registry) {
    registry
        .register(OperationDescriptor::action("first", echo))
        .expect("register");
    registry
        .register(OperationDescriptor::cron("nightly", "@daily", |_: &str| {
            Ok(ActionResponse::default())
        }))
        .expect("register");
    registry
        .register(OperationDescriptor::navigation("second", echo))
        .expect("register");

    let indices: Vec<Option<usize>> = registry
        .actions()
        .iter()
        .map(|op| op.index())
        .collect();
    assert_eq!(indices, vec![Some(0), None, Some(1)]);
}

#[rstest]
fn commands_carry_no_index(mut registry: Registry) {
    let op = registry
        .register(OperationDescriptor::command("refresh", |_: &str| Ok(())))
        .expect("register");
    assert_eq!(op.index(), None);
}

#[rstest]
fn describe_is_reserved(mut registry: Registry) {
    let err = registry
        .register(OperationDescriptor::action("Describe", echo))
        .expect_err("reserved");
    assert_eq!(
        err,
        RegistryError::ReservedId {
            id: "describe".into()
        }
    );
    assert!(registry.is_empty());
}

#[rstest]
fn unusable_names_are_rejected(mut registry: Registry) {
    let err = registry
        .register(OperationDescriptor::action("!!!", echo))
        .expect_err("empty id");
    assert!(matches!(err, RegistryError::EmptyId { name } if name == "!!!"));
}

#[rstest]
fn re_registration_replaces_and_keeps_position(mut registry: Registry) {
    registry
        .register(OperationDescriptor::action("alpha", constant("old")))
        .expect("register");
    registry
        .register(OperationDescriptor::action("beta", echo))
        .expect("register");
    registry
        .register(OperationDescriptor::action("alpha", constant("new")))
        .expect("register");

    assert_eq!(registry.len(), 2);
    let ids: Vec<&str> = registry.actions().iter().map(|op| op.id()).collect();
    assert_eq!(ids, vec!["alpha", "beta"]);
    let alpha = registry.lookup("alpha").expect("registered");
    assert_eq!(alpha.index(), Some(0));
    assert_eq!(alpha.invoke("").expect("invoke"), "new");
}

#[rstest]
fn actions_shadow_commands_with_the_same_id(mut registry: Registry) {
    registry
        .register(OperationDescriptor::command("sync", |_: &str| Ok(())))
        .expect("register");
    registry
        .register(OperationDescriptor::action("sync", constant("from action")))
        .expect("register");

    assert_eq!(registry.len(), 2);
    assert!(registry.command("sync").is_some());
    assert_eq!(
        registry.resolve_and_invoke("sync", "").expect("invoke"),
        "from action"
    );
}

// ---------------------------------------------------------------------------
// Lookup and invocation
// ---------------------------------------------------------------------------

#[rstest]
fn lookup_is_exact(mut registry: Registry) {
    registry
        .register(OperationDescriptor::action("read-file", echo))
        .expect("register");
    assert!(registry.lookup("read-file").is_some());
    assert!(registry.lookup("Read-File").is_none());
    assert!(registry.lookup("read-file ").is_none());
}

#[rstest]
fn unknown_operation_is_reported(registry: Registry) {
    let err = registry
        .resolve_and_invoke("nope", "")
        .expect_err("unknown");
    assert_eq!(err.to_string(), "unknown operation: nope");
    assert_eq!(err.kind(), crate::ErrorKind::UnknownOperation);
}

#[rstest]
fn schema_violations_never_reach_the_handler(mut registry: Registry) {
    registry
        .register(
            OperationDescriptor::action("read-file", |_: &str| -> Result<String, HandlerError> {
                Err(HandlerError::failed("handler should not run"))
            })
            .with_argument(Argument::string("name", "file name").required()),
        )
        .expect("register");

    let err = registry
        .resolve_and_invoke("read-file", "{}")
        .expect_err("invalid");
    assert_eq!(err.kind(), crate::ErrorKind::Decode);
    assert!(err.to_string().contains("missing required argument 'name'"));
}

#[rstest]
fn handler_argument_errors_are_decode_errors(mut registry: Registry) {
    registry
        .register(OperationDescriptor::action("picky", |_: &str| -> Result<String, HandlerError> {
            Err(HandlerError::invalid_arguments("bad shape"))
        }))
        .expect("register");
    let err = registry
        .resolve_and_invoke("picky", "{}")
        .expect_err("invalid");
    assert_eq!(err.kind(), crate::ErrorKind::Decode);
}

#[rstest]
fn handler_failures_pass_message_through(mut registry: Registry) {
    registry
        .register(OperationDescriptor::action("fail", |_: &str| -> Result<String, HandlerError> {
            Err(HandlerError::failed("disk on fire"))
        }))
        .expect("register");
    let err = registry
        .resolve_and_invoke("fail", "")
        .expect_err("failure");
    assert_eq!(err.kind(), crate::ErrorKind::Handler);
    assert_eq!(err.to_string(), "disk on fire");
}

#[rstest]
fn operations_lists_everything_in_registration_order(mut registry: Registry) {
    registry
        .register(OperationDescriptor::command("one", |_: &str| Ok(())))
        .expect("register");
    registry
        .register(OperationDescriptor::action("two", echo))
        .expect("register");
    let ids: Vec<&str> = registry.operations().iter().map(|op| op.id()).collect();
    assert_eq!(ids, vec!["one", "two"]);
    assert_eq!(registry.commands().len(), 1);
    assert_eq!(registry.unit_id(), "file-tools");
}
