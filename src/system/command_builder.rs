// src/system/command_builder.rs

use crate::{
    constants::{DEFAULT_SHELL, FALLBACK_SHELL_PATH, SHELL_SCRIPT_FLAG},
    models::ExecTask,
    system::environment::EnvironmentSource,
};
use std::env;
use std::ffi::OsStr;

/// The concrete program and argument vector for a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// The executable, either a bare name looked up on `PATH` or a path.
    pub program: String,
    /// Arguments passed to the executable, one element per argv slot.
    pub args: Vec<String>,
}

impl CommandLine {
    /// A shell-quoted rendering of the full command line, for printing and logging.
    pub fn display(&self) -> String {
        let words = std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str));
        shlex::try_join(words.clone()).unwrap_or_else(|_| words.collect::<Vec<_>>().join(" "))
    }
}

/// Builds the command line for `task`.
///
/// Direct tasks run `command` with `args` exactly as given. Shell tasks run
/// `<shell> -c <script>`, where the script is the command followed by the
/// space-joined arguments.
pub fn build_command_line(task: &ExecTask, ambient: &dyn EnvironmentSource) -> CommandLine {
    if !task.shell {
        return CommandLine {
            program: task.command.clone(),
            args: task.args.clone(),
        };
    }

    let shell = resolve_shell(ambient.var("PATH").as_deref());
    CommandLine {
        program: shell,
        args: vec![SHELL_SCRIPT_FLAG.to_string(), shell_script(task)],
    }
}

/// The script handed to the shell's `-c` flag.
pub fn shell_script(task: &ExecTask) -> String {
    if task.args.is_empty() {
        task.command.clone()
    } else {
        format!("{} {}", task.command, task.args.join(" "))
    }
}

/// Picks the shell interpreter: the default shell if it is on `search_path`,
/// the fixed fallback location otherwise. Never fails; a missing fallback shows
/// up later as a start error.
pub fn resolve_shell(search_path: Option<&OsStr>) -> String {
    if search_path.is_some_and(|paths| is_executable_in_path(DEFAULT_SHELL, paths)) {
        DEFAULT_SHELL.to_string()
    } else {
        log::debug!(
            "'{}' not found on PATH, falling back to '{}'.",
            DEFAULT_SHELL,
            FALLBACK_SHELL_PATH
        );
        FALLBACK_SHELL_PATH.to_string()
    }
}

fn is_executable_in_path(executable_name: &str, search_path: &OsStr) -> bool {
    env::split_paths(search_path).any(|dir| dir.join(executable_name).is_file())
}
