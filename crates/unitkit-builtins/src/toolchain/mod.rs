//! External build tools driven by the `build` operation.
//!
//! [`BuildPipeline`] expands a fixed list of [`BuildStep`]s for one source
//! tree and hands each [`Invocation`] to a [`Toolchain`]. The production
//! [`ProcessToolchain`] spawns the program in its own process group, drains
//! both pipes on helper threads, and kills the whole group once the step's
//! time budget is spent.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, warn};
use unitkit::HandlerError;

/// Tracing target for toolchain operations.
const TOOLCHAIN_TARGET: &str = "unitkit_builtins::toolchain";

/// Interval between exit-status polls.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long pipe output is awaited once a step has exited.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Time budget applied to each step of the default pipeline.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(60);

/// Placeholder replaced with the absolute path of the entry source file.
pub const MAIN_PLACEHOLDER: &str = "{main}";

/// Placeholder replaced with the absolute path of the output binary.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// A fully expanded program run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program looked up on `PATH`.
    pub program: String,
    /// Arguments passed verbatim.
    pub args: Vec<String>,
    /// Directory the program runs in.
    pub working_dir: Utf8PathBuf,
    /// Budget after which the program is killed.
    pub timeout: Duration,
}

/// Runs external programs on behalf of the build operation.
pub trait Toolchain: Send + Sync {
    /// Runs the invocation to completion and returns its stdout.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::Timeout`] when the budget is exceeded,
    /// [`HandlerError::NonZeroExit`] carrying the captured stderr when the
    /// program fails, and [`HandlerError::Io`] when it cannot be started.
    fn run(&self, invocation: &Invocation) -> Result<String, HandlerError>;
}

/// [`Toolchain`] backed by `std::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessToolchain;

impl Toolchain for ProcessToolchain {
    fn run(&self, invocation: &Invocation) -> Result<String, HandlerError> {
        debug!(
            target: TOOLCHAIN_TARGET,
            program = %invocation.program,
            args = ?invocation.args,
            working_dir = %invocation.working_dir,
            "spawning build step"
        );

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        own_process_group(&mut command);
        let mut child = command.spawn().map_err(|err| {
            HandlerError::io(format!("error while starting '{}'", invocation.program), err)
        })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        // Pipe readers of a killed step are abandoned rather than joined.
        let code = wait_for_exit(&invocation.program, &mut child, invocation.timeout)?;
        if !settle([&stdout, &stderr], Instant::now() + DRAIN_GRACE) {
            // Descendants of the step still hold the pipes, so the group exists.
            signal_group(&child);
        }
        let deadline = Instant::now() + DRAIN_GRACE;
        let stdout = collect(stdout, deadline);
        let stderr = collect(stderr, deadline);

        match code {
            Some(status) => Err(HandlerError::NonZeroExit {
                program: invocation.program.clone(),
                status,
                stderr,
            }),
            None => Ok(stdout),
        }
    }
}

#[cfg(unix)]
fn own_process_group(command: &mut Command) {
    use std::os::unix::process::CommandExt;

    command.process_group(0);
}

#[cfg(not(unix))]
const fn own_process_group(_command: &mut Command) {}

/// Sends `SIGKILL` to every process in the child's group.
#[cfg(unix)]
fn signal_group(child: &Child) {
    let Ok(pgid) = libc::pid_t::try_from(child.id()) else {
        return;
    };
    // A negative pid addresses the process group.
    if unsafe { libc::kill(-pgid, libc::SIGKILL) } != 0 {
        debug!(target: TOOLCHAIN_TARGET, pgid, "no processes left in build step group");
    }
}

#[cfg(not(unix))]
const fn signal_group(_child: &Child) {}

fn drain(pipe: Option<impl Read + Send + 'static>) -> Option<JoinHandle<String>> {
    pipe.map(|mut reader| {
        thread::spawn(move || {
            let mut bytes = Vec::new();
            if reader.read_to_end(&mut bytes).is_err() {
                bytes.clear();
            }
            String::from_utf8_lossy(&bytes).into_owned()
        })
    })
}

/// Waits until every reader has finished or `deadline` passes.
fn settle(readers: [&Option<JoinHandle<String>>; 2], deadline: Instant) -> bool {
    let done = || {
        readers
            .into_iter()
            .all(|reader| reader.as_ref().is_none_or(JoinHandle::is_finished))
    };
    while !done() && Instant::now() < deadline {
        thread::sleep(POLL_INTERVAL);
    }
    done()
}

/// Joins a pipe reader if it finishes before `deadline`.
fn collect(handle: Option<JoinHandle<String>>, deadline: Instant) -> String {
    let Some(reader) = handle else {
        return String::new();
    };
    while !reader.is_finished() && Instant::now() < deadline {
        thread::sleep(POLL_INTERVAL);
    }
    if reader.is_finished() {
        reader.join().unwrap_or_default()
    } else {
        warn!(target: TOOLCHAIN_TARGET, "abandoning build step output still held open");
        String::new()
    }
}

/// Waits for the child, returning `Some(status)` for an unsuccessful exit.
fn wait_for_exit(
    program: &str,
    child: &mut Child,
    timeout: Duration,
) -> Result<Option<i32>, HandlerError> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!(target: TOOLCHAIN_TARGET, program, ?status, "build step exited");
                if status.success() {
                    return Ok(None);
                }
                return Ok(Some(status.code().unwrap_or(-1)));
            }
            Ok(None) => {
                if start.elapsed() > timeout {
                    warn!(
                        target: TOOLCHAIN_TARGET,
                        program,
                        timeout_secs = timeout.as_secs(),
                        "build step timed out, killing process group"
                    );
                    signal_group(child);
                    drop(child.kill());
                    drop(child.wait());
                    return Err(HandlerError::Timeout {
                        program: program.to_owned(),
                        timeout_secs: timeout.as_secs(),
                    });
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(err) => {
                signal_group(child);
                return Err(HandlerError::io(
                    format!("error while waiting for '{program}'"),
                    err,
                ));
            }
        }
    }
}

/// One program in a [`BuildPipeline`], with placeholder arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStep {
    program: String,
    args: Vec<String>,
}

impl BuildStep {
    /// Creates a step. Arguments may contain [`MAIN_PLACEHOLDER`] and
    /// [`OUTPUT_PLACEHOLDER`].
    #[must_use]
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Program name.
    #[must_use]
    pub const fn program(&self) -> &str {
        self.program.as_str()
    }

    fn expand(
        &self,
        working_dir: &Utf8Path,
        main: &Utf8Path,
        output: &Utf8Path,
        timeout: Duration,
    ) -> Invocation {
        Invocation {
            program: self.program.clone(),
            args: self
                .args
                .iter()
                .map(|arg| {
                    arg.replace(MAIN_PLACEHOLDER, main.as_str())
                        .replace(OUTPUT_PLACEHOLDER, output.as_str())
                })
                .collect(),
            working_dir: working_dir.to_path_buf(),
            timeout,
        }
    }
}

/// Ordered build steps sharing one per-step time budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPipeline {
    entry_file: String,
    steps: Vec<BuildStep>,
    timeout: Duration,
}

impl BuildPipeline {
    /// Creates a pipeline compiling `entry_file` inside the working directory.
    #[must_use]
    pub fn new(entry_file: impl Into<String>, steps: Vec<BuildStep>, timeout: Duration) -> Self {
        Self {
            entry_file: entry_file.into(),
            steps,
            timeout,
        }
    }

    /// The Go pipeline: tidy modules, fix imports, then compile `main.go`.
    #[must_use]
    pub fn go() -> Self {
        Self::new(
            "main.go",
            vec![
                BuildStep::new("go", ["mod", "tidy"]),
                BuildStep::new("goimports", ["-w", MAIN_PLACEHOLDER]),
                BuildStep::new("go", ["build", "-o", OUTPUT_PLACEHOLDER, MAIN_PLACEHOLDER]),
            ],
            DEFAULT_STEP_TIMEOUT,
        )
    }

    /// Steps in run order.
    #[must_use]
    pub fn steps(&self) -> &[BuildStep] {
        &self.steps
    }

    /// Per-step time budget.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Expands every step for one build.
    #[must_use]
    pub fn invocations(&self, working_dir: &Utf8Path, output: &Utf8Path) -> Vec<Invocation> {
        let main = working_dir.join(&self.entry_file);
        self.steps
            .iter()
            .map(|step| step.expand(working_dir, &main, output, self.timeout))
            .collect()
    }

    /// Runs every step in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first error reported by the toolchain.
    pub fn run(
        &self,
        toolchain: &dyn Toolchain,
        working_dir: &Utf8Path,
        output: &Utf8Path,
    ) -> Result<(), HandlerError> {
        for invocation in self.invocations(working_dir, output) {
            toolchain.run(&invocation)?;
        }
        Ok(())
    }
}

impl Default for BuildPipeline {
    fn default() -> Self {
        Self::go()
    }
}
