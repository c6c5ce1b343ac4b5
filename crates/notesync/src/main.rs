//! `notesync`: edit a shared note from the terminal.

/// CLI module - command-line interface for notesync
mod cli;

fn main() {
    cli::run_cli();
}
