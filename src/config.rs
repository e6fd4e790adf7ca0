//! Server configuration: a plain `serde`-derived struct loaded from TOML, with a
//! `Default` impl so a missing or partial config file still produces a usable
//! server.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

fn default_inode_table_size() -> usize {
    50
}

fn default_max_dir_entries() -> usize {
    20
}

fn default_max_name_len() -> usize {
    40
}

fn default_max_path_len() -> usize {
    100
}

fn default_move_backoff_ms() -> u64 {
    2
}

/// Bounds the server runs with, loaded once at startup and shared read-only across
/// every worker thread via `Arc<ServerContext>`. Every field has a default, so a
/// missing `config.toml` (or a config file that omits a field) still produces a
/// usable server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub inode_table_size: usize,
    pub max_dir_entries: usize,
    pub max_name_len: usize,
    pub max_path_len: usize,
    pub move_backoff_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            inode_table_size: default_inode_table_size(),
            max_dir_entries: default_max_dir_entries(),
            max_name_len: default_max_name_len(),
            max_path_len: default_max_path_len(),
            move_backoff_ms: default_move_backoff_ms(),
        }
    }
}

impl ServerConfig {
    /// Reads and parses a TOML config file. Returns an `anyhow::Error` wrapping the
    /// I/O or parse failure — config loading happens at the binary boundary, where
    /// `anyhow` is the error type the rest of the stack also uses.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)?;
        let config = toml::from_str(&text)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = ServerConfig::default();
        assert_eq!(config.inode_table_size, 50);
        assert_eq!(config.max_dir_entries, 20);
        assert_eq!(config.max_name_len, 40);
        assert_eq!(config.max_path_len, 100);
        assert_eq!(config.move_backoff_ms, 2);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: ServerConfig = toml::from_str("inode_table_size = 100\n").unwrap();
        assert_eq!(config.inode_table_size, 100);
        assert_eq!(config.max_dir_entries, 20);
    }
}
