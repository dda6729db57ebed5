// src/bin/taskexec.rs

use clap::Parser;
use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use taskexec::{
    CancellationToken,
    cli::{Cli, handlers},
};

/// The main entry point of the `taskexec` application.
/// It sets up logging and Ctrl+C handling, runs the requested action on a blocking
/// worker, and performs centralized error handling.
#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    // Ctrl+C flips the token; the runner notices it and kills the child.
    let cancellation_token: CancellationToken = Arc::new(AtomicBool::new(false));
    let signal_token = Arc::clone(&cancellation_token);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::debug!("Ctrl+C received, cancelling the running task.");
            signal_token.store(true, Ordering::SeqCst);
        }
    });

    let outcome =
        tokio::task::spawn_blocking(move || handlers::dispatch(cli, &cancellation_token)).await;

    let exit_code = match outcome {
        Ok(Ok(code)) => code,
        Ok(Err(e)) => {
            eprintln!("\n{}: {:#}", "Error".red().bold(), e);
            1
        }
        Err(e) => {
            eprintln!("\n{}: worker failed: {}", "Error".red().bold(), e);
            1
        }
    };
    std::process::exit(exit_code);
}
