//! Trait for sleep record storage backends

use super::live::LiveQuery;
use crate::error::Result;
use crate::record::SleepRecord;
use chrono::{DateTime, Utc};

/// Trait for sleep record storage backends
///
/// This trait allows the repository facade to run against SQLite or a test
/// double interchangeably.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SleepRecordStore: Send + Sync {
    /// Insert or replace a record, returning its id
    async fn insert(&self, record: &SleepRecord) -> Result<i64>;

    /// Delete the row with the record's id (no-op when absent)
    async fn delete(&self, record: &SleepRecord) -> Result<()>;

    /// Delete every record, returning how many were removed
    async fn delete_all(&self) -> Result<u64>;

    /// Subscribe to every record, newest first
    ///
    /// Must be called from within a Tokio runtime.
    fn get_all_sleep_data(&self) -> LiveQuery;

    /// Get the record with the latest date
    async fn get_latest_sleep_data(&self) -> Result<Option<SleepRecord>>;

    /// Subscribe to records dated at or after `start_date`, newest first
    ///
    /// Must be called from within a Tokio runtime.
    fn get_sleep_data_from_date(&self, start_date: DateTime<Utc>) -> LiveQuery;

    /// Get the store name (for logging)
    fn name(&self) -> &'static str;
}
