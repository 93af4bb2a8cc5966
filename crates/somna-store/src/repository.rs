//! Repository - Application-facing access to sleep history
//!
//! Wraps a [`SleepRecordStore`] with the operations the application layer
//! uses. Failures are logged with the operation name and then returned to
//! the caller unchanged.

use crate::error::Result;
use crate::record::SleepRecord;
use crate::store::{LiveQuery, SleepRecordStore};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, error};

/// Facade over a sleep record store
pub struct SleepRepository<S: SleepRecordStore> {
    store: Arc<S>,
}

impl<S: SleepRecordStore> Clone for SleepRepository<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: SleepRecordStore> SleepRepository<S> {
    /// Create a repository over the given store
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Get the underlying store
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persist a sleep record, returning its id
    pub async fn save_sleep_data(&self, record: &SleepRecord) -> Result<i64> {
        self.store.insert(record).await.inspect_err(|e| {
            error!(store = self.store.name(), "Error saving sleep data: {}", e);
        })
    }

    /// Live view of the full sleep history
    pub fn sleep_history(&self) -> LiveQuery {
        self.store.get_all_sleep_data()
    }

    /// Live view of the last `days` days of sleep history
    pub fn sleep_data_since(&self, days: i64) -> LiveQuery {
        let start = Utc::now() - Duration::days(days.max(0));
        debug!("Watching sleep data since {}", start);
        self.store.get_sleep_data_from_date(start)
    }

    /// Most recent sleep record
    pub async fn latest_sleep_data(&self) -> Result<Option<SleepRecord>> {
        self.store.get_latest_sleep_data().await.inspect_err(|e| {
            error!(store = self.store.name(), "Error getting latest sleep data: {}", e);
        })
    }

    /// Remove a sleep record
    pub async fn delete_sleep_data(&self, record: &SleepRecord) -> Result<()> {
        self.store.delete(record).await.inspect_err(|e| {
            error!(store = self.store.name(), "Error deleting sleep data: {}", e);
        })
    }

    /// Remove the whole history, returning how many records were removed
    pub async fn clear_history(&self) -> Result<u64> {
        self.store.delete_all().await.inspect_err(|e| {
            error!(store = self.store.name(), "Error clearing sleep history: {}", e);
        })
    }
}
