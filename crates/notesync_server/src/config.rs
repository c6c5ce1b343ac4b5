use std::env;
use std::path::PathBuf;

/// Server configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Server host (default: 0.0.0.0)
    pub host: String,
    /// Server port (default: 3300)
    pub port: u16,
    /// Database file path (default: ./notesync_server.db)
    pub database_path: PathBuf,
    /// WebSocket route peers connect to (default: /collaborate)
    pub relay_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3300,
            database_path: PathBuf::from("./notesync_server.db"),
            relay_path: "/collaborate".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = lookup("HOST").unwrap_or(defaults.host);
        let port = match lookup("PORT") {
            Some(port) => port.parse().map_err(|_| ConfigError::InvalidPort(port))?,
            None => defaults.port,
        };
        let database_path = lookup("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.database_path);
        let relay_path = match lookup("RELAY_PATH") {
            Some(path) if path.starts_with('/') => path,
            Some(path) => return Err(ConfigError::InvalidRelayPath(path)),
            None => defaults.relay_path,
        };

        Ok(Config {
            host,
            port,
            database_path,
            relay_path,
        })
    }

    /// Get the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    InvalidPort(String),
    InvalidRelayPath(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidPort(port) => write!(f, "Invalid PORT value: {}", port),
            ConfigError::InvalidRelayPath(path) => {
                write!(f, "RELAY_PATH must start with '/': {}", path)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
