//! SleepStore - SQLite-based sleep record storage

use super::config::StoreConfig;
use super::helpers::{in_transaction, row_to_record, rows_to_records};
use super::live::{LiveQuery, SnapshotQuery};
use super::notify::{ChangeKind, ChangeNotifier, TableChange};
use super::traits::SleepRecordStore;
use crate::error::{Error, Result};
use crate::record::{date_to_millis, SleepRecord};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Name of the sleep record table
pub const SLEEP_TABLE: &str = "sleep_data";

const SELECT_ALL: &str = r#"
    SELECT id, date, duration, quality, heartRate, stepCount,
           deepSleepDuration, lightSleepDuration, remSleepDuration
    FROM sleep_data
    ORDER BY date DESC, id DESC
"#;

const SELECT_LATEST: &str = r#"
    SELECT id, date, duration, quality, heartRate, stepCount,
           deepSleepDuration, lightSleepDuration, remSleepDuration
    FROM sleep_data
    ORDER BY date DESC, id DESC
    LIMIT 1
"#;

const SELECT_FROM_DATE: &str = r#"
    SELECT id, date, duration, quality, heartRate, stepCount,
           deepSleepDuration, lightSleepDuration, remSleepDuration
    FROM sleep_data
    WHERE date >= ?1
    ORDER BY date DESC, id DESC
"#;

/// Sleep record store backed by a SQLite pool
#[derive(Clone)]
pub struct SleepStore {
    pool: SqlitePool,
    notifier: ChangeNotifier,
    snapshot_buffer: usize,
    db_path: Option<PathBuf>,
}

impl SleepStore {
    /// Create a store over an existing pool, creating the table if needed
    pub async fn with_pool(pool: SqlitePool, notifier: ChangeNotifier) -> Result<Self> {
        let store = Self {
            pool,
            notifier,
            snapshot_buffer: StoreConfig::default().snapshot_buffer,
            db_path: None,
        };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Open (or create) the database file described by `config`
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            notifier: ChangeNotifier::new(config.change_capacity),
            snapshot_buffer: config.snapshot_buffer.max(1),
            db_path: Some(config.db_path.clone()),
        };
        store.run_migrations().await?;

        info!("SQLite sleep store initialized at {}", config.db_path.display());
        Ok(store)
    }

    /// Create a new in-memory store (for testing)
    pub async fn in_memory() -> Result<Self> {
        // a single connection that never expires, or the database vanishes
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let store = Self {
            pool,
            notifier: ChangeNotifier::default(),
            snapshot_buffer: StoreConfig::default().snapshot_buffer,
            db_path: None,
        };
        store.run_migrations().await?;

        debug!("In-memory SQLite sleep store initialized");
        Ok(store)
    }

    /// Create the sleep table and its index
    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sleep_data (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                date INTEGER,
                duration REAL NOT NULL,
                quality INTEGER NOT NULL,
                heartRate INTEGER NOT NULL,
                stepCount INTEGER NOT NULL,
                deepSleepDuration REAL NOT NULL,
                lightSleepDuration REAL NOT NULL,
                remSleepDuration REAL NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_sleep_data_date
            ON sleep_data(date DESC)
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("Database migrations completed");
        Ok(())
    }

    /// Get a reference to the underlying connection pool
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Path of the database file; `None` for in-memory or adopted pools
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Get the change notifier writes publish to
    #[must_use]
    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert a record, replacing any existing row with the same id.
    ///
    /// An id of 0 lets SQLite assign the next one. Returns the stored id.
    #[instrument(skip(self, record), fields(record_id = record.id))]
    pub async fn insert(&self, record: &SleepRecord) -> Result<i64> {
        let record = record.clone();

        let id = in_transaction(&self.pool, move |conn| {
            Box::pin(async move {
                let result = sqlx::query(
                    r#"
                    INSERT OR REPLACE INTO sleep_data (
                        id, date, duration, quality, heartRate, stepCount,
                        deepSleepDuration, lightSleepDuration, remSleepDuration
                    ) VALUES (nullif(?1, 0), ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    "#,
                )
                .bind(record.id)
                .bind(date_to_millis(record.date))
                .bind(record.duration)
                .bind(record.quality)
                .bind(record.heart_rate)
                .bind(record.step_count)
                .bind(record.deep_sleep_duration)
                .bind(record.light_sleep_duration)
                .bind(record.rem_sleep_duration)
                .execute(&mut *conn)
                .await?;

                Ok::<_, Error>(result.last_insert_rowid())
            })
        })
        .await?;

        self.notifier
            .publish(TableChange::new(SLEEP_TABLE, ChangeKind::Insert));
        debug!("Stored sleep record {}", id);
        Ok(id)
    }

    /// Delete the row with the record's id; absent rows are not an error
    pub async fn delete(&self, record: &SleepRecord) -> Result<()> {
        self.delete_by_id(record.id).await.map(|_| ())
    }

    /// Delete a row by id, returning how many rows were removed
    #[instrument(skip(self))]
    pub async fn delete_by_id(&self, id: i64) -> Result<u64> {
        let removed = in_transaction(&self.pool, move |conn| {
            Box::pin(async move {
                let result = sqlx::query("DELETE FROM sleep_data WHERE id = ?1")
                    .bind(id)
                    .execute(&mut *conn)
                    .await?;
                Ok::<_, Error>(result.rows_affected())
            })
        })
        .await?;

        if removed > 0 {
            self.notifier
                .publish(TableChange::new(SLEEP_TABLE, ChangeKind::Delete));
        }
        debug!("Deleted {} sleep record(s) with id {}", removed, id);
        Ok(removed)
    }

    /// Delete every row in one transaction, returning how many were removed
    #[instrument(skip(self))]
    pub async fn delete_all(&self) -> Result<u64> {
        let removed = in_transaction(&self.pool, |conn| {
            Box::pin(async move {
                let result = sqlx::query("DELETE FROM sleep_data")
                    .execute(&mut *conn)
                    .await?;
                Ok::<_, Error>(result.rows_affected())
            })
        })
        .await?;

        if removed > 0 {
            self.notifier
                .publish(TableChange::new(SLEEP_TABLE, ChangeKind::Clear));
        }
        debug!("Cleared {} sleep record(s)", removed);
        Ok(removed)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Subscribe to every record, newest first.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn get_all_sleep_data(&self) -> LiveQuery {
        self.live(SnapshotQuery::All)
    }

    /// Subscribe to records dated at or after `start_date`, newest first.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn get_sleep_data_from_date(&self, start_date: DateTime<Utc>) -> LiveQuery {
        self.live(SnapshotQuery::FromDate(date_to_millis(start_date)))
    }

    /// Get the record with the latest date, if any
    #[instrument(skip(self))]
    pub async fn get_latest_sleep_data(&self) -> Result<Option<SleepRecord>> {
        let row = sqlx::query(SELECT_LATEST)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    /// Like [`get_latest_sleep_data`](Self::get_latest_sleep_data), but gives
    /// up with [`Error::Cancelled`] if `cancel` fires before the query completes.
    #[instrument(skip(self, cancel))]
    pub async fn get_latest_sleep_data_cancellable(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<SleepRecord>> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        tokio::select! {
            biased;
            latest = self.get_latest_sleep_data() => latest,
            _ = cancel.cancelled() => {
                debug!("Latest sleep record read cancelled");
                Err(Error::Cancelled)
            }
        }
    }

    /// One snapshot of every record, newest first
    #[instrument(skip(self))]
    pub async fn all_sleep_data(&self) -> Result<Vec<SleepRecord>> {
        fetch_all(&self.pool).await
    }

    /// One snapshot of records dated at or after `start_date`, newest first
    #[instrument(skip(self))]
    pub async fn sleep_data_from_date(
        &self,
        start_date: DateTime<Utc>,
    ) -> Result<Vec<SleepRecord>> {
        fetch_from_date(&self.pool, date_to_millis(start_date)).await
    }

    /// Count stored records
    #[instrument(skip(self))]
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sleep_data")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    fn live(&self, query: SnapshotQuery) -> LiveQuery {
        // subscribe before the first evaluation so no write slips between them
        let changes = self.notifier.subscribe();
        LiveQuery::spawn(self.pool.clone(), query, changes, self.snapshot_buffer)
    }
}

pub(crate) async fn fetch_all(pool: &SqlitePool) -> Result<Vec<SleepRecord>> {
    let rows = sqlx::query(SELECT_ALL).fetch_all(pool).await?;
    rows_to_records(&rows)
}

pub(crate) async fn fetch_from_date(pool: &SqlitePool, millis: i64) -> Result<Vec<SleepRecord>> {
    let rows = sqlx::query(SELECT_FROM_DATE)
        .bind(millis)
        .fetch_all(pool)
        .await?;
    rows_to_records(&rows)
}

#[async_trait::async_trait]
impl SleepRecordStore for SleepStore {
    async fn insert(&self, record: &SleepRecord) -> Result<i64> {
        SleepStore::insert(self, record).await
    }

    async fn delete(&self, record: &SleepRecord) -> Result<()> {
        SleepStore::delete(self, record).await
    }

    async fn delete_all(&self) -> Result<u64> {
        SleepStore::delete_all(self).await
    }

    fn get_all_sleep_data(&self) -> LiveQuery {
        SleepStore::get_all_sleep_data(self)
    }

    async fn get_latest_sleep_data(&self) -> Result<Option<SleepRecord>> {
        SleepStore::get_latest_sleep_data(self).await
    }

    fn get_sleep_data_from_date(&self, start_date: DateTime<Utc>) -> LiveQuery {
        SleepStore::get_sleep_data_from_date(self, start_date)
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
