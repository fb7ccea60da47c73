pub mod action;
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod housekeeping;
pub mod lock;
pub mod placeholder;
pub mod runtime;
pub mod service;
pub mod socket;
pub mod trigger;
pub mod ui;
pub mod watch;

use clap::Parser;

use crate::bootstrap::AppPaths;
use crate::cli::Cli;
use crate::error::AppResult;

/// Parses the flat flag surface, resolves well-known paths, and hands off
/// to the runtime: either this process becomes the daemon, or it relays one
/// command to an already-running instance, per spec.md §6.
pub fn run() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .with_level(true)
        .compact()
        .init();

    let cli = Cli::parse();

    let paths = match &cli.config {
        Some(path) => AppPaths {
            config_file: path.clone(),
            ..AppPaths::resolve()?
        },
        None => AppPaths::resolve()?,
    };
    paths.ensure_dirs()?;

    if cli.version {
        println!("macrowhisper {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let relay = cli.relay_command();
    runtime::run(paths, relay)
}
