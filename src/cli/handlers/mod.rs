// src/cli/handlers/mod.rs

// One module per CLI action.

pub mod commons;
pub mod run;
pub mod script;
pub mod task;

use crate::{
    CancellationToken,
    cli::{Cli, CliCommand},
};
use anyhow::Result;

/// Routes the parsed command line to its handler and returns the process exit code.
pub fn dispatch(cli: Cli, cancellation_token: &CancellationToken) -> Result<i32> {
    log::debug!("CLI args parsed: {:?}", cli);
    match cli.command {
        CliCommand::Run(args) => run::handle(args, cancellation_token),
        CliCommand::Script(args) => script::handle(args, cancellation_token),
        CliCommand::Task(args) => task::handle(args, cancellation_token),
    }
}
