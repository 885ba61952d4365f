//! Behaviour tests for layered configuration loading.
//!
//! Scenarios mutate process environment variables, so every harness holds a
//! global lock for its lifetime and restores the previous values on drop.

use std::cell::RefCell;
use std::ffi::OsString;
use std::fs;
use std::sync::{Mutex, MutexGuard, PoisonError};

use once_cell::sync::Lazy;
use ortho_config::OrthoConfig;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

use unitkit_config::{
    Config, ErrorChannel, ManifestFormat, default_log_filter, default_log_format,
    default_manifest_format,
};

static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

struct Harness {
    dir: TempDir,
    args: RefCell<Vec<OsString>>,
    file_lines: RefCell<Vec<String>>,
    saved_env: RefCell<Vec<(String, Option<OsString>)>>,
    outcome: RefCell<Option<Result<Config, String>>>,
    _lock: MutexGuard<'static, ()>,
}

impl Harness {
    fn new() -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        Self {
            dir: TempDir::new().unwrap_or_else(|error| panic!("temp dir: {error}")),
            args: RefCell::new(vec![OsString::from("unitkit-files")]),
            file_lines: RefCell::new(Vec::new()),
            saved_env: RefCell::new(Vec::new()),
            outcome: RefCell::new(None),
            _lock: lock,
        }
    }

    fn file_value(&self, key: &str, value: &str) {
        self.file_lines
            .borrow_mut()
            .push(format!("{key} = \"{value}\""));
    }

    fn env_value(&self, key: &str, value: &str) {
        self.saved_env
            .borrow_mut()
            .push((key.to_owned(), std::env::var_os(key)));
        // Serialised by ENV_LOCK; restored in `Drop`.
        unsafe { std::env::set_var(key, value) };
    }

    fn flag(&self, name: &str, value: &str) {
        let mut args = self.args.borrow_mut();
        args.push(OsString::from(name));
        args.push(OsString::from(value));
    }

    fn config(&self) -> Config {
        if self.outcome.borrow().is_none() {
            let result = self.load();
            *self.outcome.borrow_mut() = Some(result);
        }
        match self.outcome.borrow().as_ref() {
            Some(Ok(config)) => config.clone(),
            Some(Err(error)) => panic!("configuration failed to load: {error}"),
            None => panic!("configuration was not loaded"),
        }
    }

    fn load(&self) -> Result<Config, String> {
        let mut args = self.args.borrow().clone();
        let lines = self.file_lines.borrow();
        if !lines.is_empty() {
            let path = self.dir.path().join("unitkit.toml");
            fs::write(&path, lines.join("\n")).map_err(|error| error.to_string())?;
            args.push(OsString::from("--config-path"));
            args.push(path.into_os_string());
        }
        Config::load_from_iter(args).map_err(|error| error.to_string())
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        for (key, previous) in self.saved_env.borrow_mut().drain(..).rev() {
            match previous {
                Some(value) => unsafe { std::env::set_var(&key, value) },
                None => unsafe { std::env::remove_var(&key) },
            }
        }
    }
}

fn channel(text: &str) -> ErrorChannel {
    text.parse()
        .unwrap_or_else(|error| panic!("invalid error channel '{text}': {error}"))
}

fn manifest_format(text: &str) -> ManifestFormat {
    text.parse()
        .unwrap_or_else(|error| panic!("invalid manifest format '{text}': {error}"))
}

#[fixture]
fn harness() -> Harness {
    Harness::new()
}

// ---------------------------------------------------------------------------
// Given / when steps
// ---------------------------------------------------------------------------

#[given("a configuration file setting {key} to {value}")]
fn given_file(harness: &Harness, key: String, value: String) {
    harness.file_value(key.trim_matches('"'), value.trim_matches('"'));
}

#[given("the environment sets {variable} to {value}")]
fn given_env(harness: &Harness, variable: String, value: String) {
    harness.env_value(variable.trim_matches('"'), value.trim_matches('"'));
}

#[when("the command line passes {flag} with {value}")]
fn when_flag(harness: &Harness, flag: String, value: String) {
    harness.flag(flag.trim_matches('"'), value.trim_matches('"'));
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then("the error channel is {expected}")]
fn then_channel(harness: &Harness, expected: String) {
    assert_eq!(
        harness.config().error_channel(),
        channel(expected.trim_matches('"'))
    );
}

#[then("the manifest format is {expected}")]
fn then_manifest_format(harness: &Harness, expected: String) {
    assert_eq!(
        harness.config().manifest_format(),
        manifest_format(expected.trim_matches('"'))
    );
}

#[then("the built-in defaults apply")]
fn then_defaults(harness: &Harness) {
    let config = harness.config();
    assert_eq!(config.error_channel(), ErrorChannel::Stdout);
    assert_eq!(config.log_filter(), default_log_filter());
    assert_eq!(config.log_format(), default_log_format());
    assert_eq!(config.manifest_format(), default_manifest_format());
    assert!(!config.structured_errors());
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Built-in defaults apply when nothing is overridden"
)]
fn defaults_apply(#[from(harness)] harness: Harness) {
    let _ = harness;
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "A configuration file overrides the defaults"
)]
fn file_overrides_defaults(#[from(harness)] harness: Harness) {
    let _ = harness;
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "The environment overrides the configuration file"
)]
fn environment_overrides_file(#[from(harness)] harness: Harness) {
    let _ = harness;
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Command-line flags override the environment"
)]
fn flags_override_environment(#[from(harness)] harness: Harness) {
    let _ = harness;
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Layers combine across fields"
)]
fn layers_combine(#[from(harness)] harness: Harness) {
    let _ = harness;
}
