// src/models.rs

use crate::system::context::Interruption;
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A byte sink shared with the caller. Locked for every chunk written to it.
pub type SharedWriter = Arc<Mutex<dyn Write + Send>>;

/// A byte source shared with the caller, copied into the child's stdin.
pub type SharedReader = Arc<Mutex<dyn Read + Send>>;

// --- TASK DEFINITION ---

/// Declarative description of one command to run.
///
/// A task is only read while it executes, so the same value can be executed
/// any number of times. Build it with struct-update syntax:
///
/// ```
/// use taskexec::models::ExecTask;
///
/// let task = ExecTask {
///     command: "echo".to_string(),
///     args: vec!["hello".to_string()],
///     ..Default::default()
/// };
/// assert!(!task.shell);
/// ```
#[derive(Default)]
pub struct ExecTask {
    /// The executable to run, or the literal command line when `shell` is set.
    pub command: String,

    /// Arguments for the command. Never split on whitespace.
    pub args: Vec<String>,

    /// Run the command through `sh -c` instead of executing it directly.
    pub shell: bool,

    /// `KEY=VALUE` overrides. Variables not named here are inherited unchanged.
    pub env: Vec<String>,

    /// Working directory. `None` inherits the caller's.
    pub cwd: Option<PathBuf>,

    /// Copied into the child's stdin. When `None` the child reads from the null device.
    pub stdin: Option<SharedReader>,

    /// Print the command line before executing it.
    pub print_command: bool,

    /// Mirror stdout and stderr to this process's own stdout/stderr as the command runs.
    pub stream_stdio: bool,

    /// Keep the output out of the result. Useful for very large output, or when
    /// the output is only meant for the other destinations.
    pub disable_stdio_buffer: bool,

    /// Receives a copy of stdout.
    pub stdout_writer: Option<SharedWriter>,

    /// Receives a copy of stderr.
    pub stderr_writer: Option<SharedWriter>,

    /// Maximum run time before the child is killed. `None` or zero means no limit.
    ///
    /// Only the direct child is killed. In shell mode, commands the shell started
    /// can keep the output pipes open, and the call returns once they close.
    pub timeout: Option<Duration>,

    /// Receives the raw stdout.
    pub output_file: Option<File>,

    /// Receives the raw stderr.
    pub error_file: Option<File>,
}

impl ExecTask {
    /// Creates a direct (non-shell) task for `command` with no arguments.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    /// The effective deadline duration, treating zero as "no timeout".
    pub fn effective_timeout(&self) -> Option<Duration> {
        self.timeout.filter(|timeout| !timeout.is_zero())
    }
}

impl fmt::Debug for ExecTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecTask")
            .field("command", &self.command)
            .field("args", &self.args)
            .field("shell", &self.shell)
            .field("env", &self.env)
            .field("cwd", &self.cwd)
            .field("stdin", &self.stdin.is_some())
            .field("print_command", &self.print_command)
            .field("stream_stdio", &self.stream_stdio)
            .field("disable_stdio_buffer", &self.disable_stdio_buffer)
            .field("stdout_writer", &self.stdout_writer.is_some())
            .field("stderr_writer", &self.stderr_writer.is_some())
            .field("timeout", &self.timeout)
            .field("output_file", &self.output_file)
            .field("error_file", &self.error_file)
            .finish()
    }
}

// --- EXECUTION RESULT ---

/// Everything known about a finished execution.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Captured stdout. Empty when buffering was disabled.
    pub stdout: String,
    /// Captured stderr. Empty when buffering was disabled.
    pub stderr: String,
    /// `0` on success, the child's status otherwise, `-1` when the runner killed
    /// the child or it never started. Negative signal numbers on Unix for
    /// children killed by a signal the runner did not send.
    pub exit_code: i32,
    /// The task's deadline expired and the child was killed.
    pub timed_out: bool,
    /// The caller cancelled the execution and the child was killed.
    pub cancelled: bool,
    /// Wall-clock time from process start to process exit.
    pub duration: Duration,
}

impl ExecResult {
    /// A result for an execution that never reached the point of producing an exit status.
    pub(crate) fn interrupted(cause: Interruption, duration: Duration) -> Self {
        Self {
            exit_code: crate::constants::UNKNOWN_EXIT_CODE,
            timed_out: cause == Interruption::DeadlineExceeded,
            cancelled: cause == Interruption::Cancelled,
            duration,
            ..Default::default()
        }
    }

    /// `true` when the child exited on its own with status `0`.
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out && !self.cancelled
    }

    /// Why the execution context expired, if it did.
    pub fn interruption(&self) -> Option<Interruption> {
        if self.cancelled {
            Some(Interruption::Cancelled)
        } else if self.timed_out {
            Some(Interruption::DeadlineExceeded)
        } else {
            None
        }
    }
}
