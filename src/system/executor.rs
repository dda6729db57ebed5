// src/system/executor.rs

use crate::{
    constants::{COPY_BUFFER_SIZE, UNKNOWN_EXIT_CODE, WAIT_POLL_INTERVAL},
    models::{ExecResult, ExecTask, SharedReader, SharedWriter},
    system::{
        command_builder::{self, CommandLine},
        context::{ExecContext, Interruption},
        environment::{self, EnvironmentSource, ProcessEnvironment},
        fanout::FanOutWriter,
    },
};
use colored::Colorize;
use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::{self, ScopedJoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Failures that prevented a task from producing a normal result.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Execution aborted before the command was started: {cause}")]
    Aborted {
        cause: Interruption,
        result: Box<ExecResult>,
    },
    #[error("Script not found: {}", .0.display())]
    ScriptNotFound(PathBuf),
    #[error("No command specified to run.")]
    EmptyCommand,
    #[error("Command '{0}' could not be executed: {1}")]
    CommandFailed(String, #[source] io::Error),
    #[error("Could not wait for command '{0}': {1}")]
    WaitFailed(String, #[source] io::Error),
}

impl ExecutionError {
    /// The result that accompanies the error, for errors that carry one.
    pub fn result(&self) -> Option<&ExecResult> {
        match self {
            Self::Aborted { result, .. } => Some(&**result),
            _ => None,
        }
    }
}

/// How the wait for the child ended.
enum WaitOutcome {
    Exited(ExitStatus),
    Interrupted(Interruption),
}

/// Runs [`ExecTask`]s against an ambient environment.
#[derive(Debug, Default, Clone)]
pub struct ProcessRunner<E = ProcessEnvironment> {
    environment: E,
}

impl ProcessRunner {
    /// A runner that inherits from the real process environment.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<E: EnvironmentSource> ProcessRunner<E> {
    /// A runner that treats `environment` as the ambient environment.
    pub fn with_environment(environment: E) -> Self {
        Self { environment }
    }

    /// Executes `task` and blocks until the child is gone.
    ///
    /// Non-zero exits, timeouts and cancellations are all `Ok`: inspect
    /// [`ExecResult::exit_code`], [`ExecResult::timed_out`] and
    /// [`ExecResult::cancelled`]. Errors mean no process ran (or its status could
    /// not be read), except for [`ExecutionError::Aborted`], which still carries a
    /// result with the matching flag set.
    pub fn run(&self, task: &ExecTask, ctx: &ExecContext) -> Result<ExecResult, ExecutionError> {
        let ctx = match task.effective_timeout() {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx.clone(),
        };

        let command_line = command_builder::build_command_line(task, &self.environment);
        let label = command_line.display();
        if task.print_command {
            println!("{} {}", "exec:".blue(), label.green());
        }

        // Don't even try to start if the context is already gone.
        if let Some(cause) = ctx.err() {
            log::debug!("Not starting '{}': {}", label, cause);
            return Err(ExecutionError::Aborted {
                cause,
                result: Box::new(ExecResult::interrupted(cause, Duration::ZERO)),
            });
        }

        let mut command = self.prepare_command(task, &command_line)?;

        let mut stdout_buffer = Vec::new();
        let mut stderr_buffer = Vec::new();
        let stdout_fanout = build_fanout(
            "stdout",
            task.output_file.as_ref(),
            (!task.disable_stdio_buffer).then_some(&mut stdout_buffer),
            task.stream_stdio.then(|| Box::new(io::stdout()) as Box<dyn Write + Send>),
            task.stdout_writer.as_ref(),
        );
        let stderr_fanout = build_fanout(
            "stderr",
            task.error_file.as_ref(),
            (!task.disable_stdio_buffer).then_some(&mut stderr_buffer),
            task.stream_stdio.then(|| Box::new(io::stderr()) as Box<dyn Write + Send>),
            task.stderr_writer.as_ref(),
        );

        log::debug!("Spawning '{}'.", label);
        log::trace!("argv: {:?} {:?}", command_line.program, command_line.args);
        let started = Instant::now();
        let mut child = command
            .spawn()
            .map_err(|e| ExecutionError::CommandFailed(label.clone(), e))?;
        let stdin_pipe = child.stdin.take();
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        let waited = thread::scope(|scope| {
            // Whatever happens below, the child does not outlive this scope.
            let mut child = scopeguard::guard(child, |mut child| terminate(&mut child));

            let feeder = match (stdin_pipe, task.stdin.as_ref()) {
                (Some(pipe), Some(reader)) => Some(scope.spawn(move || feed_stdin(reader, pipe))),
                _ => None,
            };
            let stdout_drain = stdout_pipe.map(|pipe| scope.spawn(move || drain(pipe, stdout_fanout)));
            let stderr_drain = stderr_pipe.map(|pipe| scope.spawn(move || drain(pipe, stderr_fanout)));

            let waited = wait_for_exit(&mut child, &ctx);
            if waited.is_err() {
                terminate(&mut child);
            }

            join_worker(feeder, "stdin");
            join_worker(stdout_drain, "stdout");
            join_worker(stderr_drain, "stderr");
            waited
        });

        let (outcome, exited_at) = waited.map_err(|e| ExecutionError::WaitFailed(label.clone(), e))?;
        let duration = exited_at.duration_since(started);

        let mut result = match outcome {
            WaitOutcome::Exited(status) => ExecResult {
                exit_code: exit_code(status),
                duration,
                ..Default::default()
            },
            WaitOutcome::Interrupted(cause) => ExecResult::interrupted(cause, duration),
        };
        result.stdout = String::from_utf8_lossy(&stdout_buffer).into_owned();
        result.stderr = String::from_utf8_lossy(&stderr_buffer).into_owned();

        log::debug!(
            "'{}' finished with code {} after {:?} (timed out: {}, cancelled: {}).",
            label,
            result.exit_code,
            result.duration,
            result.timed_out,
            result.cancelled
        );
        Ok(result)
    }

    fn prepare_command(
        &self,
        task: &ExecTask,
        command_line: &CommandLine,
    ) -> Result<Command, ExecutionError> {
        if command_line.program.is_empty() {
            return Err(ExecutionError::EmptyCommand);
        }

        let mut command = Command::new(&command_line.program);
        command
            .args(&command_line.args)
            .stdin(if task.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(cwd) = task.cwd.as_deref().filter(|cwd| !cwd.as_os_str().is_empty()) {
            command.current_dir(dunce::simplified(cwd));
        }

        if let Some(env) = environment::resolve_environment(&task.env, &self.environment) {
            command.env_clear().envs(env);
        }

        Ok(command)
    }
}

impl ExecTask {
    /// Executes the task against the real process environment.
    /// See [`ProcessRunner::run`].
    pub fn execute(&self, ctx: &ExecContext) -> Result<ExecResult, ExecutionError> {
        ProcessRunner::new().run(self, ctx)
    }
}

/// Assembles the destinations of one output stream, in delivery order.
fn build_fanout<'a>(
    stream: &'static str,
    file: Option<&'a File>,
    buffer: Option<&'a mut Vec<u8>>,
    terminal: Option<Box<dyn Write + Send>>,
    writer: Option<&SharedWriter>,
) -> FanOutWriter<'a> {
    let mut fanout = FanOutWriter::new(stream);
    if let Some(file) = file {
        fanout.push("file", file);
    }
    if let Some(buffer) = buffer {
        fanout.push("buffer", buffer);
    }
    if let Some(terminal) = terminal {
        fanout.push("terminal", terminal);
    }
    if let Some(writer) = writer {
        fanout.push_shared("writer", Arc::clone(writer));
    }
    fanout
}

/// Polls the child until it exits or the context expires, killing it in the latter case.
fn wait_for_exit(child: &mut Child, ctx: &ExecContext) -> io::Result<(WaitOutcome, Instant)> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((WaitOutcome::Exited(status), Instant::now()));
        }

        if let Some(cause) = ctx.err() {
            log::debug!("{} Killing child process (PID: {})...", cause, child.id());
            if let Err(e) = child.kill() {
                log::warn!("Failed to kill child process {}: {}", child.id(), e);
            }
            child.wait()?;
            return Ok((WaitOutcome::Interrupted(cause), Instant::now()));
        }

        // Never sleep past the deadline.
        let pause = ctx
            .remaining()
            .map_or(WAIT_POLL_INTERVAL, |left| left.min(WAIT_POLL_INTERVAL));
        thread::sleep(pause);
    }
}

/// Kills and reaps the child if it is still running.
fn terminate(child: &mut Child) {
    if let Ok(None) = child.try_wait() {
        log::debug!("Reaping child process {} before returning.", child.id());
        if let Err(e) = child.kill() {
            log::warn!("Failed to kill child process {}: {}", child.id(), e);
        }
        child.wait().ok();
    }
}

/// Copies one of the child's output pipes into its fan-out until EOF.
fn drain(pipe: impl Read, mut fanout: FanOutWriter<'_>) {
    let mut reader = BufReader::with_capacity(COPY_BUFFER_SIZE, pipe);
    if let Err(e) = io::copy(&mut reader, &mut fanout) {
        log::warn!("Failed to read the child's {}: {}", fanout.stream(), e);
    }
    fanout.flush().ok();

    let failed = fanout.failed_sinks();
    if !failed.is_empty() {
        log::debug!("{} destinations dropped: {:?}", fanout.stream(), failed);
    }
}

/// Copies the caller's reader into the child's stdin, then closes it.
fn feed_stdin(reader: &SharedReader, mut pipe: ChildStdin) {
    let copied = match reader.lock() {
        Ok(mut source) => io::copy(&mut *source, &mut pipe).map(|_| ()),
        Err(_) => Err(io::Error::other("stdin reader mutex is poisoned")),
    };

    match copied {
        Ok(()) => {}
        // The child exited or closed its stdin without reading everything.
        Err(e) if e.kind() == ErrorKind::BrokenPipe => {
            log::debug!("Child closed stdin early: {}", e);
        }
        Err(e) => log::warn!("Failed to feed the child's stdin: {}", e),
    }
}

fn join_worker(handle: Option<ScopedJoinHandle<'_, ()>>, name: &str) {
    if let Some(handle) = handle {
        if handle.join().is_err() {
            log::warn!("The {} worker thread panicked.", name);
        }
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| signal_exit_code(status))
        .unwrap_or(UNKNOWN_EXIT_CODE)
}

/// Children killed by a signal report the negated signal number.
#[cfg(unix)]
fn signal_exit_code(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map(|signal| -signal)
}

#[cfg(not(unix))]
fn signal_exit_code(_status: ExitStatus) -> Option<i32> {
    None
}
