//! Store configuration

use super::helpers::default_db_path;
use std::path::PathBuf;

/// Default number of pooled SQLite connections
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Default change notification buffer
const DEFAULT_CHANGE_CAPACITY: usize = 256;

/// Default number of undelivered snapshots a live query may hold
const DEFAULT_SNAPSHOT_BUFFER: usize = 4;

/// Configuration for opening a [`SleepStore`](super::SleepStore)
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path of the SQLite database file
    pub db_path: PathBuf,
    /// Maximum pooled connections
    pub max_connections: u32,
    /// Capacity of the change notification channel
    pub change_capacity: usize,
    /// Snapshots buffered per live query before the producer waits
    pub snapshot_buffer: usize,
}

impl StoreConfig {
    /// Create a config for the given database path with default limits
    #[must_use]
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Default::default()
        }
    }

    /// Set the connection pool size
    #[must_use]
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    /// Set the notification and snapshot buffer sizes
    #[must_use]
    pub fn with_buffers(mut self, change_capacity: usize, snapshot_buffer: usize) -> Self {
        self.change_capacity = change_capacity.max(1);
        self.snapshot_buffer = snapshot_buffer.max(1);
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            change_capacity: DEFAULT_CHANGE_CAPACITY,
            snapshot_buffer: DEFAULT_SNAPSHOT_BUFFER,
        }
    }
}
