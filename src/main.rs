//! Memocache CLI - run a command, caching its stdout
//!
//! Repeated invocations of the same command within the cache duration
//! print the recorded stdout without re-running the process.

use std::process;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use memocache::cli::{self, Args, CommandError};

fn main() {
    // Initialize tracing subscriber with env filter.
    // Defaults to "warn" level, can be overridden with RUST_LOG env var.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memocache=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    match cli::run(args) {
        Ok(stdout) => println!("{stdout}"),
        Err(err) => {
            // A non-zero child exit already wrote to stderr; anything else
            // deserves a message of its own.
            if !matches!(err, CommandError::Failed { .. }) {
                eprintln!("memocache: {err}");
            }
            process::exit(err.exit_code());
        }
    }
}
