//! Helper functions for store module

use crate::error::{Error, Result};
use crate::record::{millis_to_date, SleepRecord};
use futures::future::BoxFuture;
use sqlx::sqlite::{Sqlite, SqliteConnection, SqlitePool, SqliteRow};
use sqlx::Row;
use tracing::warn;

/// Read a column, treating any decode failure as corrupted data
fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(name)
        .map_err(|e| Error::DataIntegrity(format!("column '{name}': {e}")))
}

/// Convert a SQLite row to a SleepRecord
///
/// The `date` column is nullable in SQL; a null or unconvertible value is
/// reported as a data integrity error instead of being defaulted.
pub(crate) fn row_to_record(row: &SqliteRow) -> Result<SleepRecord> {
    let date = millis_to_date(column::<Option<i64>>(row, "date")?)?;

    Ok(SleepRecord {
        id: column(row, "id")?,
        date,
        duration: column(row, "duration")?,
        quality: column(row, "quality")?,
        heart_rate: column(row, "heartRate")?,
        step_count: column(row, "stepCount")?,
        deep_sleep_duration: column(row, "deepSleepDuration")?,
        light_sleep_duration: column(row, "lightSleepDuration")?,
        rem_sleep_duration: column(row, "remSleepDuration")?,
    })
}

/// Convert every row, failing on the first corrupted one
pub(crate) fn rows_to_records(rows: &[SqliteRow]) -> Result<Vec<SleepRecord>> {
    rows.iter().map(row_to_record).collect()
}

/// Run `op` inside a transaction.
///
/// Commits when `op` returns `Ok`, rolls back when it returns `Err`. If the
/// future is dropped midway the transaction guard rolls back on drop.
pub(crate) async fn in_transaction<T, F>(pool: &SqlitePool, op: F) -> Result<T>
where
    T: Send,
    F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T>>,
{
    let mut tx = pool.begin().await?;
    let outcome = op(&mut *tx).await;

    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!("Rollback failed after {}: {}", err, rollback_err);
            }
            Err(err)
        }
    }
}

/// Get the default data directory for Somna
pub fn default_data_dir() -> std::path::PathBuf {
    dirs::home_dir()
        .map(|p| p.join(".somna"))
        .unwrap_or_else(|| std::path::PathBuf::from(".somna"))
}

/// Get the default database path
pub fn default_db_path() -> std::path::PathBuf {
    default_data_dir().join("sleep_database.db")
}
