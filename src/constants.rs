// src/constants.rs

use std::time::Duration;

/// The shell looked up on `PATH` for shell-mode tasks.
pub const DEFAULT_SHELL: &str = "sh";

/// Where the shell is assumed to live when `PATH` lookup fails.
pub const FALLBACK_SHELL_PATH: &str = "/usr/bin/sh";

/// The flag that makes the shell read its script from the next argument.
pub const SHELL_SCRIPT_FLAG: &str = "-c";

/// Exit code reported when the process never produced an exit status of its own.
pub const UNKNOWN_EXIT_CODE: i32 = -1;

/// How often the runner checks the child and the context while waiting.
pub const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Chunk size used when draining the child's pipes.
pub const COPY_BUFFER_SIZE: usize = 8 * 1024;

/// Exit code of the `taskexec` binary when the task timed out (same as coreutils `timeout`).
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Exit code of the `taskexec` binary when the task was interrupted with Ctrl+C.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;
