//! Configuration loading and management.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server identity.
    pub server: ServerConfig,
    /// Network listen configuration.
    pub listen: ListenConfig,
    /// Channel history configuration.
    #[serde(default)]
    pub history: HistoryConfig,
    /// Game content and room defaults.
    #[serde(default)]
    pub game: GameConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name shown in the login greeting.
    pub name: String,
    /// Message of the day, sent after login.
    #[serde(default)]
    pub motd: Option<String>,
    /// Account names granted administrative commands.
    #[serde(default)]
    pub admins: Vec<String>,
}

/// Network listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Address to listen on (e.g. "0.0.0.0:4000").
    pub addr: String,
    /// Per-connection outbound queue depth. A client that falls this far
    /// behind starts losing lines rather than stalling dispatch.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
}

/// Channel history configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// Entries retained per channel before the oldest is evicted.
    #[serde(default = "default_history_capacity")]
    pub capacity: usize,
    /// Entries shown by the history commands when no count is given.
    #[serde(default = "default_history_replay")]
    pub replay: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_history_capacity(),
            replay: default_history_replay(),
        }
    }
}

/// Game content and room defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct GameConfig {
    /// Starting lifepoints per team in a fresh room.
    #[serde(default = "default_lifepoints")]
    pub default_lifepoints: u32,
    /// Banlist applied to fresh rooms when the account saved none.
    #[serde(default = "default_banlist")]
    pub default_banlist: String,
    /// Path to the card store data file.
    #[serde(default = "default_cards_path")]
    pub cards_path: String,
    /// Directory of help topic files.
    #[serde(default = "default_help_dir")]
    pub help_dir: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            default_lifepoints: default_lifepoints(),
            default_banlist: default_banlist(),
            cards_path: default_cards_path(),
            help_dir: default_help_dir(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path, or ":memory:".
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_outbound_queue() -> usize {
    256
}

fn default_history_capacity() -> usize {
    200
}

fn default_history_replay() -> usize {
    30
}

fn default_lifepoints() -> u32 {
    8000
}

fn default_banlist() -> String {
    "tcg".to_string()
}

fn default_cards_path() -> String {
    "cards.json".to_string()
}

fn default_help_dir() -> String {
    "help".to_string()
}

fn default_db_path() -> String {
    "duelhall.db".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            name = "test.hall"

            [listen]
            addr = "127.0.0.1:4000"
            "#,
        )
        .expect("minimal config should parse");

        assert_eq!(config.history.capacity, 200);
        assert_eq!(config.history.replay, 30);
        assert_eq!(config.game.default_lifepoints, 8000);
        assert_eq!(config.game.default_banlist, "tcg");
        assert_eq!(config.database.path, "duelhall.db");
        assert!(config.server.admins.is_empty());
    }

    #[test]
    fn test_explicit_values_override_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            name = "test.hall"
            admins = ["Maru"]

            [listen]
            addr = "127.0.0.1:4000"
            outbound_queue = 16

            [history]
            capacity = 5
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.listen.outbound_queue, 16);
        assert_eq!(config.history.capacity, 5);
        assert_eq!(config.server.admins, vec!["Maru".to_string()]);
    }
}
