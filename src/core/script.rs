// src/core/script.rs

use crate::{
    constants::DEFAULT_SHELL,
    models::{ExecResult, ExecTask},
    system::{context::ExecContext, executor::ExecutionError},
};
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// A single adjustment to the task built by [`execute_shell_script`].
///
/// Options are applied in the order given, so a later option overrides an earlier
/// one touching the same field. `Args` is the exception: it appends.
#[derive(Debug)]
pub enum ScriptOption {
    /// Interpreter used to run the script (default `sh`). An empty name is ignored.
    Shell(String),
    /// Environment overrides, `KEY=VALUE`. Replaces any earlier `Env`.
    Env(Vec<String>),
    /// Working directory for the script.
    Cwd(PathBuf),
    /// Extra arguments appended after the script path.
    Args(Vec<String>),
    /// Raw destinations for the script's stdout and stderr.
    OutputFiles {
        /// Receives stdout.
        stdout: File,
        /// Receives stderr.
        stderr: File,
    },
}

impl ScriptOption {
    /// Applies the option to `task`.
    pub fn apply(self, task: &mut ExecTask) {
        match self {
            Self::Shell(shell) => {
                if !shell.is_empty() {
                    task.command = shell;
                    task.shell = true;
                }
            }
            Self::Env(env) => task.env = env,
            Self::Cwd(cwd) => task.cwd = Some(cwd),
            Self::Args(args) => task.args.extend(args),
            Self::OutputFiles { stdout, stderr } => {
                task.output_file = Some(stdout);
                task.error_file = Some(stderr);
            }
        }
    }
}

/// The task a script runs with before any option is applied.
pub fn default_script_task(script_path: &Path) -> ExecTask {
    ExecTask {
        command: DEFAULT_SHELL.to_string(),
        args: vec![script_path.to_string_lossy().into_owned()],
        shell: true,
        ..Default::default()
    }
}

/// Builds the task for `script_path` with `options` applied, without running it.
pub fn build_script_task(
    script_path: &Path,
    options: impl IntoIterator<Item = ScriptOption>,
) -> ExecTask {
    let mut task = default_script_task(script_path);
    for option in options {
        option.apply(&mut task);
    }
    task
}

/// Runs a script file through a shell.
///
/// The file must exist when this is called; otherwise
/// [`ExecutionError::ScriptNotFound`] is returned and nothing is executed. The check
/// is a pre-flight convenience, not a guarantee against the file disappearing
/// before the shell opens it.
pub fn execute_shell_script(
    ctx: &ExecContext,
    script_path: impl AsRef<Path>,
    options: impl IntoIterator<Item = ScriptOption>,
) -> Result<ExecResult, ExecutionError> {
    let script_path = script_path.as_ref();
    ensure_script_exists(script_path)?;

    let task = build_script_task(script_path, options);
    log::debug!("Running script '{}' with '{}'.", script_path.display(), task.command);
    task.execute(ctx)
}

/// Runs a task previously built with [`build_script_task`], with the same pre-flight check.
pub fn run_script_task(
    ctx: &ExecContext,
    script_path: &Path,
    task: &ExecTask,
) -> Result<ExecResult, ExecutionError> {
    ensure_script_exists(script_path)?;
    task.execute(ctx)
}

fn ensure_script_exists(script_path: &Path) -> Result<(), ExecutionError> {
    match fs::metadata(script_path) {
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(ExecutionError::ScriptNotFound(script_path.to_path_buf()))
        }
        Err(e) => {
            // Anything else (e.g. permissions) is left for the shell to report.
            log::debug!("Could not stat '{}': {}", script_path.display(), e);
            Ok(())
        }
        Ok(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn write_script(content: &str) -> NamedTempFile {
        let mut script = tempfile::Builder::new()
            .prefix("test_script_")
            .suffix(".sh")
            .tempfile()
            .unwrap();
        script.write_all(content.as_bytes()).unwrap();
        script.flush().unwrap();
        script
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_missing_script_is_reported_before_execution() {
        // --- Setup ---
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.sh");

        // --- Execute ---
        // A cancelled context would make the core fail differently, so reaching
        // ScriptNotFound proves the core was never invoked.
        let ctx = ExecContext::background();
        ctx.cancel();
        let err = execute_shell_script(&ctx, &missing, []).unwrap_err();

        // --- Assert ---
        match err {
            ExecutionError::ScriptNotFound(path) => assert_eq!(path, missing),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_default_task_shape() {
        let task = default_script_task(Path::new("/tmp/build.sh"));
        assert_eq!(task.command, "sh");
        assert_eq!(task.args, strings(&["/tmp/build.sh"]));
        assert!(task.shell);
    }

    #[test]
    fn test_options_apply_in_order() {
        // --- Execute ---
        let task = build_script_task(
            Path::new("run.sh"),
            [
                ScriptOption::Shell("bash".to_string()),
                ScriptOption::Shell(String::new()),
                ScriptOption::Env(strings(&["A=1"])),
                ScriptOption::Env(strings(&["B=2"])),
                ScriptOption::Args(strings(&["one"])),
                ScriptOption::Args(strings(&["two"])),
                ScriptOption::Cwd(PathBuf::from("/first")),
                ScriptOption::Cwd(PathBuf::from("/second")),
            ],
        );

        // --- Assert ---
        assert_eq!(task.command, "bash");
        assert_eq!(task.env, strings(&["B=2"]));
        assert_eq!(task.args, strings(&["run.sh", "one", "two"]));
        assert_eq!(task.cwd, Some(PathBuf::from("/second")));
    }

    #[test]
    fn test_prebuilt_task_gets_the_same_preflight_check() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone.sh");
        let task = build_script_task(&missing, [ScriptOption::Shell("bash".to_string())]);

        let err = run_script_task(&ExecContext::background(), &missing, &task).unwrap_err();

        assert!(matches!(err, ExecutionError::ScriptNotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_script_with_default_shell() {
        let script = write_script("#!/bin/sh\necho \"Hello, World!\"\n");

        let result = execute_shell_script(&ExecContext::background(), script.path(), []).unwrap();

        assert_eq!(result.stdout, "Hello, World!\n");
        assert_eq!(result.exit_code, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_script_with_env() {
        let script = write_script("#!/bin/sh\necho \"GREETING: $GREETING\"\necho \"FOO: $FOO\"\n");

        let result = execute_shell_script(
            &ExecContext::background(),
            script.path(),
            [ScriptOption::Env(strings(&[
                "GREETING=Hello, Custom World!",
                "FOO=BarValue",
            ]))],
        )
        .unwrap();

        assert_eq!(
            result.stdout,
            "GREETING: Hello, Custom World!\nFOO: BarValue\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_script_with_args() {
        let script = write_script("#!/bin/sh\necho \"First Argument: $1\"\necho \"Second Argument: $2\"\n");

        let result = execute_shell_script(
            &ExecContext::background(),
            script.path(),
            [ScriptOption::Args(strings(&["HelloArg", "WorldArg"]))],
        )
        .unwrap();

        assert_eq!(
            result.stdout,
            "First Argument: HelloArg\nSecond Argument: WorldArg\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_script_with_cwd() {
        // --- Setup ---
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("testfile.txt"), "Content from CWD test").unwrap();
        let script = write_script(
            "#!/bin/sh\nif [ -f \"testfile.txt\" ]; then\n  echo \"File exists in CWD\"\nelse\n  echo \"File not found in CWD\"\nfi\n",
        );

        // --- Execute ---
        let result = execute_shell_script(
            &ExecContext::background(),
            script.path(),
            [ScriptOption::Cwd(dir.path().to_path_buf())],
        )
        .unwrap();

        // --- Assert ---
        assert_eq!(result.stdout, "File exists in CWD\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_script_with_output_files() {
        let script = write_script("#!/bin/sh\necho out\necho err 1>&2\n");
        let out = NamedTempFile::new().unwrap();
        let err = NamedTempFile::new().unwrap();

        let result = execute_shell_script(
            &ExecContext::background(),
            script.path(),
            [ScriptOption::OutputFiles {
                stdout: out.as_file().try_clone().unwrap(),
                stderr: err.as_file().try_clone().unwrap(),
            }],
        )
        .unwrap();

        assert_eq!(result.stdout, "out\n");
        assert_eq!(fs::read_to_string(out.path()).unwrap(), "out\n");
        assert_eq!(fs::read_to_string(err.path()).unwrap(), "err\n");
    }
}
