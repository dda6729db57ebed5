// src/cli/handlers/task.rs

use super::commons;
use crate::{CancellationToken, cli::TaskArgs, core::task_file};
use anyhow::{Context, Result};

/// Main entry point for the 'task' command.
pub fn handle(args: TaskArgs, cancellation_token: &CancellationToken) -> Result<i32> {
    let mut task = task_file::load_task_file(&args.file)
        .with_context(|| format!("Could not load task '{}'", args.file.display()))?;

    // The file decides how output is shown, unless the caller asked for a report.
    if args.output.json || args.output.quiet {
        commons::apply_output_mode(&mut task, &args.output);
    }

    let ctx = commons::context_for(cancellation_token);
    commons::finish(task.execute(&ctx), &args.output)
}
