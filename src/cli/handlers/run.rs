// src/cli/handlers/run.rs

use super::commons;
use crate::{CancellationToken, cli::RunArgs, models::ExecTask};
use anyhow::Result;
use std::time::Duration;

/// Main entry point for the 'run' command.
pub fn handle(args: RunArgs, cancellation_token: &CancellationToken) -> Result<i32> {
    let mut task = ExecTask {
        command: args.command,
        args: args.args,
        shell: args.shell,
        env: args.env,
        cwd: args.cwd,
        timeout: args.timeout.map(Duration::from_millis),
        print_command: args.print_command,
        output_file: args
            .stdout_file
            .as_deref()
            .map(commons::open_output_file)
            .transpose()?,
        error_file: args
            .stderr_file
            .as_deref()
            .map(commons::open_output_file)
            .transpose()?,
        ..Default::default()
    };
    commons::apply_output_mode(&mut task, &args.output);

    let ctx = commons::context_for(cancellation_token);
    commons::finish(task.execute(&ctx), &args.output)
}
