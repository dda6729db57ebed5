// src/cli/handlers/commons.rs

// Shared functions used by multiple handlers.

use crate::{
    CancellationToken,
    cli::OutputArgs,
    constants::{INTERRUPTED_EXIT_CODE, TIMEOUT_EXIT_CODE},
    models::{ExecResult, ExecTask},
    system::{context::ExecContext, executor::ExecutionError},
};
use anyhow::{Context, Result};
use colored::Colorize;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Builds the execution context for a CLI invocation.
pub fn context_for(cancellation_token: &CancellationToken) -> ExecContext {
    ExecContext::new(Arc::clone(cancellation_token))
}

/// Configures how the task's output reaches the user.
///
/// By default output is streamed live and not buffered. `--json` buffers it for the
/// report instead, and `--quiet` discards it.
pub fn apply_output_mode(task: &mut ExecTask, output: &OutputArgs) {
    task.stream_stdio = !output.json && !output.quiet;
    task.disable_stdio_buffer = !output.json;
}

/// Creates (or truncates) a file to receive one of the child's streams.
pub fn open_output_file(path: &Path) -> Result<File> {
    File::create(path).with_context(|| format!("Could not create '{}'", path.display()))
}

/// Reports the outcome and turns it into the process exit code.
pub fn finish(outcome: Result<ExecResult, ExecutionError>, output: &OutputArgs) -> Result<i32> {
    let result = match outcome {
        Ok(result) => result,
        // The context was already gone: report it like any other interruption.
        Err(ExecutionError::Aborted { result, .. }) => *result,
        Err(e) => return Err(e.into()),
    };

    if output.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialize the result")?
        );
    } else if result.timed_out {
        eprintln!(
            "{} after {:.2?}.",
            "Command timed out".yellow().bold(),
            result.duration
        );
    } else if result.cancelled {
        eprintln!("{}", "Command cancelled.".yellow().bold());
    } else {
        log::debug!(
            "Command exited with code {} in {:.2?}.",
            result.exit_code,
            result.duration
        );
    }

    Ok(exit_code_for(&result))
}

/// Maps a result to the exit code of this process, the way shells do.
pub fn exit_code_for(result: &ExecResult) -> i32 {
    if result.cancelled {
        INTERRUPTED_EXIT_CODE
    } else if result.timed_out {
        TIMEOUT_EXIT_CODE
    } else if result.exit_code == -1 {
        1
    } else if result.exit_code < 0 {
        // Killed by a signal.
        128 - result.exit_code
    } else {
        result.exit_code
    }
}
