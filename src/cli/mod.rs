// src/cli/mod.rs

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod handlers;

/// taskexec: run commands and scripts with captured, streamed and mirrored output.
///
/// The process exit code mirrors the child's. Timeouts exit with 124 and
/// interruptions (Ctrl+C) with 130.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// The action to perform.
    #[command(subcommand)]
    pub command: CliCommand,
}

/// The actions understood by `taskexec`.
#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Run a command directly, or through `sh -c` with `--shell`.
    Run(RunArgs),
    /// Run a script file through a shell.
    Script(ScriptArgs),
    /// Run the task described by a TOML file.
    Task(TaskArgs),
}

/// How the outcome is reported.
#[derive(Args, Debug, Default, Clone)]
pub struct OutputArgs {
    /// Print the result as JSON instead of streaming the output.
    #[arg(long)]
    pub json: bool,

    /// Do not stream the command's output.
    #[arg(long, short)]
    pub quiet: bool,
}

/// Arguments of `taskexec run`.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Interpret the command (and its arguments) as a shell script.
    #[arg(long)]
    pub shell: bool,

    /// Environment override, `KEY=VALUE`. Repeatable.
    #[arg(long = "env", short = 'e', value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// Working directory for the command.
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// Kill the command after this many milliseconds.
    #[arg(long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// Print the command line before running it.
    #[arg(long)]
    pub print_command: bool,

    /// Also write the raw stdout to this file.
    #[arg(long, value_name = "FILE")]
    pub stdout_file: Option<PathBuf>,

    /// Also write the raw stderr to this file.
    #[arg(long, value_name = "FILE")]
    pub stderr_file: Option<PathBuf>,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub output: OutputArgs,

    /// The executable, or the script when `--shell` is given.
    pub command: String,

    /// Arguments for the command.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Arguments of `taskexec script`.
#[derive(Args, Debug, Default)]
pub struct ScriptArgs {
    /// Interpreter for the script. Defaults to `sh`.
    #[arg(long)]
    pub shell: Option<String>,

    /// Environment override, `KEY=VALUE`. Repeatable.
    #[arg(long = "env", short = 'e', value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// Working directory for the script.
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub output: OutputArgs,

    /// Path to the script.
    pub path: PathBuf,

    /// Arguments passed to the script.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Arguments of `taskexec task`.
#[derive(Args, Debug, Default)]
pub struct TaskArgs {
    #[command(flatten)]
    #[allow(missing_docs)]
    pub output: OutputArgs,

    /// Path to the TOML task file.
    pub file: PathBuf,
}
