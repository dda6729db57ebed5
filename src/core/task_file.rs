// src/core/task_file.rs

use crate::models::ExecTask;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Failures while loading a task file.
#[derive(Error, Debug)]
pub enum TaskFileError {
    /// The file could not be read.
    #[error("Could not read task file '{path}': {source}")]
    Read {
        /// The task file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a valid task definition.
    #[error("Failed to parse task file '{path}': {source}")]
    Parse {
        /// The task file.
        path: PathBuf,
        /// The TOML error.
        #[source]
        source: toml::de::Error,
    },
    /// An output file named by the task could not be created.
    #[error("Could not create output file '{path}': {source}")]
    OutputFile {
        /// The output file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// The TOML representation of an [`ExecTask`].
///
/// Relative `cwd`, `stdout_file` and `stderr_file` paths are resolved against the
/// directory containing the task file.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TaskDefinition {
    /// Program to run, or the script in shell mode.
    pub command: String,
    /// Arguments passed to the command.
    #[serde(default)]
    pub args: Vec<String>,
    /// Run the command through the shell.
    #[serde(default)]
    pub shell: bool,
    /// Environment overrides, `KEY=VALUE`.
    #[serde(default)]
    pub env: Vec<String>,
    /// Working directory.
    pub cwd: Option<PathBuf>,
    /// Milliseconds. `0` or absent disables the timeout.
    pub timeout_ms: Option<u64>,
    /// Print the command line before running it.
    #[serde(default)]
    pub print_command: bool,
    /// Forward output to the terminal.
    #[serde(default)]
    pub stream_stdio: bool,
    /// Keep the output out of the result.
    #[serde(default)]
    pub disable_stdio_buffer: bool,
    /// File receiving stdout, created or truncated.
    pub stdout_file: Option<PathBuf>,
    /// File receiving stderr, created or truncated.
    pub stderr_file: Option<PathBuf>,
}

impl TaskDefinition {
    /// Parses a definition from TOML text.
    pub fn from_toml(content: &str, origin: &Path) -> Result<Self, TaskFileError> {
        toml::from_str(content).map_err(|source| TaskFileError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Turns the definition into a runnable task, creating the output files it names.
    pub fn into_task(self, base_dir: &Path) -> Result<ExecTask, TaskFileError> {
        let resolve = |path: PathBuf| {
            if path.is_relative() {
                base_dir.join(path)
            } else {
                path
            }
        };

        let output_file = self.stdout_file.map(resolve).map(create_output).transpose()?;
        let error_file = self.stderr_file.map(resolve).map(create_output).transpose()?;

        Ok(ExecTask {
            command: self.command,
            args: self.args,
            shell: self.shell,
            env: self.env,
            cwd: self.cwd.map(resolve),
            timeout: self.timeout_ms.map(Duration::from_millis),
            print_command: self.print_command,
            stream_stdio: self.stream_stdio,
            disable_stdio_buffer: self.disable_stdio_buffer,
            output_file,
            error_file,
            ..Default::default()
        })
    }
}

fn create_output(path: PathBuf) -> Result<File, TaskFileError> {
    File::create(&path).map_err(|source| TaskFileError::OutputFile { path, source })
}

/// Reads a task file and turns it into a runnable task.
pub fn load_task_file(path: &Path) -> Result<ExecTask, TaskFileError> {
    let content = fs::read_to_string(path).map_err(|source| TaskFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let definition = TaskDefinition::from_toml(&content, path)?;
    log::debug!("Loaded task '{}' from '{}'.", definition.command, path.display());

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    definition.into_task(base_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_definition() {
        // --- Setup ---
        let content = r#"
            command = "echo"
            args = ["hello", "world"]
            shell = true
            env = ["GREETING=hi"]
            cwd = "work"
            timeout_ms = 1500
            print_command = true
            stream_stdio = true
            disable_stdio_buffer = true
        "#;

        // --- Execute ---
        let definition = TaskDefinition::from_toml(content, Path::new("task.toml")).unwrap();

        // --- Assert ---
        assert_eq!(definition.command, "echo");
        assert_eq!(definition.args, vec!["hello", "world"]);
        assert!(definition.shell);
        assert_eq!(definition.env, vec!["GREETING=hi"]);
        assert_eq!(definition.cwd, Some(PathBuf::from("work")));
        assert_eq!(definition.timeout_ms, Some(1500));
        assert!(definition.print_command);
        assert!(definition.stream_stdio);
        assert!(definition.disable_stdio_buffer);
    }

    #[test]
    fn test_minimal_definition_uses_defaults() {
        let definition = TaskDefinition::from_toml("command = \"true\"", Path::new("t.toml")).unwrap();
        assert_eq!(
            definition,
            TaskDefinition {
                command: "true".to_string(),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let result = TaskDefinition::from_toml("command = \"ls\"\nretries = 3", Path::new("t.toml"));
        assert!(matches!(result, Err(TaskFileError::Parse { .. })));
    }

    #[test]
    fn test_relative_paths_resolve_against_task_file() {
        // --- Setup ---
        let dir = TempDir::new().unwrap();
        let task_path = dir.path().join("task.toml");
        fs::write(
            &task_path,
            "command = \"ls\"\ncwd = \"sub\"\nstdout_file = \"out.log\"\ntimeout_ms = 0\n",
        )
        .unwrap();

        // --- Execute ---
        let task = load_task_file(&task_path).unwrap();

        // --- Assert ---
        assert_eq!(task.cwd, Some(dir.path().join("sub")));
        assert!(task.output_file.is_some());
        assert!(task.error_file.is_none());
        assert!(dir.path().join("out.log").exists());
        assert_eq!(task.effective_timeout(), None);
    }

    #[test]
    fn test_missing_task_file() {
        let dir = TempDir::new().unwrap();
        let result = load_task_file(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(TaskFileError::Read { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_loaded_task_runs() {
        use crate::system::context::ExecContext;

        let dir = TempDir::new().unwrap();
        let task_path = dir.path().join("greet.toml");
        fs::write(
            &task_path,
            "command = \"echo $GREETING\"\nshell = true\nenv = [\"GREETING=hi there\"]\n",
        )
        .unwrap();

        let result = load_task_file(&task_path)
            .unwrap()
            .execute(&ExecContext::background())
            .unwrap();

        assert_eq!(result.stdout, "hi there\n");
    }
}
