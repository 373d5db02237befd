//! CLI Module
//!
//! Wraps an external process invocation through the same cache-or-call
//! contract the library exposes: repeated runs of the same command serve
//! the recorded stdout instead of re-running the process.

use std::process::{Command, Stdio};

use clap::Parser;
use serde::Serialize;
use thiserror::Error;

use crate::backend::SqliteBackend;
use crate::cache::CacheBuilder;
use crate::config::CacheConfig;
use crate::key::FunctionId;
use crate::lifespan::Lifespan;

// == CLI Arguments ==
/// Run a command, caching its stdout.
#[derive(Parser, Debug)]
#[command(name = "memocache")]
#[command(about = "Run a command, caching its stdout for a configurable duration")]
pub struct Args {
    /// Mix the current working directory into the cache key
    #[arg(long)]
    pub include_dir: bool,

    /// Cache duration in minutes
    #[arg(long, default_value_t = 60)]
    pub minutes: i64,

    /// Command to run
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub cmd: Vec<String>,
}

// == Command Request ==
/// Cache-key payload for one invocation: the argv plus, optionally, the
/// directory it runs in.
#[derive(Debug, Clone, Serialize)]
pub struct CommandRequest {
    pub cmd: Vec<String>,
    pub cwd: Option<String>,
}

// == Command Error ==
/// Failure modes of the wrapped process. None of these are cached.
#[derive(Error, Debug)]
pub enum CommandError {
    /// The process ran and exited non-zero
    #[error("command exited with status {status}")]
    Failed { status: i32 },

    /// The process could not be started at all
    #[error("failed to run command: {0}")]
    Spawn(String),
}

impl CommandError {
    /// Exit code to mirror to the caller.
    pub fn exit_code(&self) -> i32 {
        match self {
            CommandError::Failed { status } => *status,
            CommandError::Spawn(_) => 1,
        }
    }
}

// == Command Runner ==
/// Runs the command, capturing stdout and passing stderr through. A
/// non-zero exit reports the child's status; only successful runs produce
/// a cacheable value.
pub fn run_command(request: &CommandRequest) -> Result<String, CommandError> {
    let (program, rest) = request
        .cmd
        .split_first()
        .ok_or_else(|| CommandError::Spawn("empty command".to_string()))?;

    let mut command = Command::new(program);
    command.args(rest).stderr(Stdio::inherit());
    if let Some(cwd) = &request.cwd {
        command.current_dir(cwd);
    }

    let output = command
        .output()
        .map_err(|e| CommandError::Spawn(format!("{program}: {e}")))?;

    if !output.status.success() {
        return Err(CommandError::Failed {
            status: output.status.code().unwrap_or(1),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

// == Entry Point ==
/// Runs one CLI invocation through the SQLite-backed cache and returns
/// the (possibly cached) stdout.
pub fn run(args: Args) -> Result<String, CommandError> {
    let config = CacheConfig::from_env();
    let backend = SqliteBackend::at_default_location(&config);
    let cached = CacheBuilder::new(backend)
        .config(config)
        .lifespan(Lifespan::minutes(args.minutes))
        .wrap_fallible(
            FunctionId::new(module_path!(), "run_command"),
            run_command,
        );

    let request = CommandRequest {
        cmd: args.cmd,
        cwd: if args.include_dir {
            std::env::current_dir()
                .ok()
                .map(|dir| dir.to_string_lossy().into_owned())
        } else {
            None
        },
    };
    cached.call(&request)
}
