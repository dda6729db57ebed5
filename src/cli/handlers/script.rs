// src/cli/handlers/script.rs

use super::commons;
use crate::{
    CancellationToken,
    cli::ScriptArgs,
    core::script::{self, ScriptOption},
};
use anyhow::Result;

/// Main entry point for the 'script' command.
pub fn handle(args: ScriptArgs, cancellation_token: &CancellationToken) -> Result<i32> {
    let mut options = Vec::new();
    if let Some(shell) = args.shell {
        options.push(ScriptOption::Shell(shell));
    }
    if !args.env.is_empty() {
        options.push(ScriptOption::Env(args.env));
    }
    if let Some(cwd) = args.cwd {
        options.push(ScriptOption::Cwd(cwd));
    }
    if !args.args.is_empty() {
        options.push(ScriptOption::Args(args.args));
    }

    let mut task = script::build_script_task(&args.path, options);
    commons::apply_output_mode(&mut task, &args.output);

    let ctx = commons::context_for(cancellation_token);
    commons::finish(script::run_script_task(&ctx, &args.path, &task), &args.output)
}
