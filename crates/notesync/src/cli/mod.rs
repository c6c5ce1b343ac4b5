/// Clap argument definitions
mod args;

/// Config command handlers
mod config;

/// `edit` command: interactive session against the relay
mod edit;

/// `show` command
mod show;

use clap::Parser;
use std::path::PathBuf;

use notesync_core::config::SyncConfig;

pub use args::Cli;
use args::Commands;

/// Helper to run async store calls in sync context
fn block_on<F: std::future::Future>(f: F) -> F::Output {
    futures_lite::future::block_on(f)
}

/// Config file the CLI reads: `--config` or the default location.
fn config_file(override_path: Option<PathBuf>) -> Option<PathBuf> {
    override_path.or_else(SyncConfig::config_path)
}

/// Effective config: file (or defaults), then environment, then flags.
fn load_config(cli: &Cli) -> Result<SyncConfig, String> {
    let config = match config_file(cli.config.clone()) {
        Some(path) => SyncConfig::load_from_or_default(&path)
            .map_err(|e| format!("Error loading config {}: {}", path.display(), e))?,
        None => SyncConfig::default(),
    };
    let mut config = config.apply_env_overrides();
    if let Some(url) = &cli.url {
        config.socket_url = url.clone();
    }
    if let Some(db) = &cli.db {
        config.database_path = db.clone();
    }
    Ok(config)
}

/// Main entry point for the CLI
pub fn run_cli() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let success = match cli.command {
        Commands::Edit { mode } => edit::handle_edit(config, mode),
        Commands::Show { raw } => show::handle_show(&config, raw),
        Commands::Config { init } => config::handle_config_command(&config, cli.config, init),
    };

    if !success {
        std::process::exit(1);
    }
}
