//! # taskexec
//!
//! Declarative subprocess execution. An [`ExecTask`](models::ExecTask) describes what to run;
//! executing it spawns the child, fans its output out to every configured destination, and
//! reduces the way it ended (exit, timeout or cancellation) to a single
//! [`ExecResult`](models::ExecResult).

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Shared cancellation flag. Setting it to `true` cancels every execution observing it.
pub type CancellationToken = Arc<AtomicBool>;

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod system;
