// src/core/mod.rs

//! Façades built on top of the process runner.

pub mod script;
pub mod task_file;
