//! Application configuration
//!
//! Configuration structures for the Somna CLI and how they map onto the
//! store's own [`StoreConfig`].

mod loader;

pub use loader::{load_config, DEFAULT_CONFIG};

use serde::{Deserialize, Serialize};
use somna_store::StoreConfig;
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding the database (defaults to ~/.somna)
    #[serde(default)]
    pub data_dir: Option<String>,
    /// Storage settings
    #[serde(default)]
    pub store: StoreSection,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSection,
}

impl AppConfig {
    /// Resolve the data directory
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(somna_store::default_data_dir)
    }

    /// Build the store configuration, letting `db_override` replace the path
    pub fn store_config(&self, db_override: Option<&Path>) -> StoreConfig {
        let db_path = db_override
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.data_dir().join(&self.store.db_file));

        StoreConfig::new(db_path)
            .with_max_connections(self.store.max_connections)
            .with_buffers(self.store.change_capacity, self.store.snapshot_buffer)
    }
}

/// Storage settings (exposed to TOML)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSection {
    /// Database file name inside the data directory
    #[serde(default = "default_db_file")]
    pub db_file: String,
    /// Pooled SQLite connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Change notification buffer
    #[serde(default = "default_change_capacity")]
    pub change_capacity: usize,
    /// Snapshots buffered per subscription
    #[serde(default = "default_snapshot_buffer")]
    pub snapshot_buffer: usize,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            db_file: default_db_file(),
            max_connections: default_max_connections(),
            change_capacity: default_change_capacity(),
            snapshot_buffer: default_snapshot_buffer(),
        }
    }
}

fn default_db_file() -> String {
    "sleep_database.db".to_string()
}
fn default_max_connections() -> u32 {
    5
}
fn default_change_capacity() -> usize {
    256
}
fn default_snapshot_buffer() -> usize {
    4
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// `EnvFilter` directive used when RUST_LOG is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

fn default_log_filter() -> String {
    "somna=info,somna_store=info".to_string()
}
