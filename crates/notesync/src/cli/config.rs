//! Config command handlers

use std::path::PathBuf;

use notesync_core::config::SyncConfig;

use crate::cli::config_file;

pub fn handle_config_command(config: &SyncConfig, config_override: Option<PathBuf>, init: bool) -> bool {
    let Some(path) = config_file(config_override) else {
        eprintln!("Could not determine a config directory; pass --config <path>.");
        return false;
    };

    if init {
        return init_config(&path);
    }

    println!("Notesync Configuration");
    println!("======================");
    println!("Config file: {}{}", path.display(), if path.exists() { "" } else { " (not found, using defaults)" });
    println!("Relay URL: {}", config.socket_url);
    println!("Database: {}", config.database_path.display());
    println!("Initial mode: {}", config.initial_mode);
    println!("Debounce: {} ms", config.debounce_ms);
    println!("Autosave interval: {} ms", config.autosave_interval_ms);
    println!(
        "Save retries: {} attempts, {} ms backoff step",
        config.max_save_attempts, config.retry_base_delay_ms
    );
    true
}

fn init_config(path: &std::path::Path) -> bool {
    if path.exists() {
        eprintln!("Config already exists at {}", path.display());
        return false;
    }
    match SyncConfig::default().save_to(path) {
        Ok(()) => {
            println!("✓ Wrote default config to {}", path.display());
            true
        }
        Err(e) => {
            eprintln!("✗ Error writing config: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        assert!(init_config(&path));
        assert_eq!(SyncConfig::load_from(&path).unwrap(), SyncConfig::default());

        // refuses to overwrite
        assert!(!init_config(&path));
    }
}
