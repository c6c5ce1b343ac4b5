use clap::{Parser, Subcommand};
use notesync_core::sync::Mode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "notesync")]
#[command(about = "Edit a shared note from the terminal", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to ~/.config/notesync/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Relay WebSocket URL (overrides config and SOCKET_URL)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// SQLite database path (overrides config and DATABASE_PATH)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the note for editing. Each stdin line is appended to the note.
    ///
    /// Lines starting with ':' are commands: :save, :mode live|periodic,
    /// :readonly, :show, :quit
    Edit {
        /// Sync mode to start in
        #[arg(long)]
        mode: Option<Mode>,
    },

    /// Print the stored note
    Show {
        /// Print the stored JSON instead of plain text
        #[arg(long)]
        raw: bool,
    },

    /// Show the effective configuration
    Config {
        /// Write a default config file
        #[arg(long)]
        init: bool,
    },
}
