//! # System Interaction Layer
//!
//! Everything that touches the operating system's process machinery lives here.
//!
//! ## Modules
//!
//! - **`command_builder`**: Turns a task's `command`/`args`/`shell` fields into the concrete
//!   program and argv, wrapping the command in `sh -c` for shell tasks.
//! - **`context`**: The cancellable deadline context threaded through an execution.
//! - **`environment`**: Resolves the child's environment from overrides and an injected
//!   snapshot of the ambient environment.
//! - **`executor`**: Spawns the child, drains its output concurrently, enforces deadlines and
//!   cancellation, and reduces the outcome to an `ExecResult`.
//! - **`fanout`**: A multi-destination writer that copies each output stream to every sink
//!   while isolating failing ones.

pub mod command_builder;
pub mod context;
pub mod environment;
pub mod executor;
pub mod fanout;
