//! Binary entrypoint serving the built-in file operations.

use std::io::{self, Write};
use std::process::ExitCode;

use camino::Utf8Path;

fn main() -> ExitCode {
    match unitkit_builtins::run(std::env::args_os(), Utf8Path::new(".")) {
        Ok(code) => code,
        Err(error) => {
            writeln!(io::stderr().lock(), "{error}").ok();
            ExitCode::FAILURE
        }
    }
}
