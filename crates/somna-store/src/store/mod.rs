//! Store - Sleep record persistence using SQLite
//!
//! This module provides the storage layer for sleep records.
//! It uses sqlx for async SQLite access, a broadcast notifier for
//! table changes, and live queries that re-run on every change.

mod config;
mod helpers;
mod live;
mod notify;
mod sleep_store;
mod traits;


pub use config::StoreConfig;
pub use helpers::{default_data_dir, default_db_path};
pub use live::LiveQuery;
pub use notify::{ChangeKind, ChangeNotifier, TableChange};
pub use sleep_store::{SleepStore, SLEEP_TABLE};
pub use traits::SleepRecordStore;

#[cfg(test)]
pub use traits::MockSleepRecordStore;
