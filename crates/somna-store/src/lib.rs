//! Somna Store - Sleep record persistence
//!
//! This crate provides the storage layer for Somna:
//! - Record: the `SleepRecord` entity and its date encoding
//! - Store: SQLite persistence, change notification and live queries
//! - Repository: the application-facing facade over a store

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod record;
pub mod repository;
pub mod store;

pub use error::{Error, Result};
pub use record::{estimate_quality, SleepRecord};
pub use repository::SleepRepository;
pub use store::{
    default_data_dir, default_db_path, ChangeKind, ChangeNotifier, LiveQuery, SleepRecordStore,
    SleepStore, StoreConfig, TableChange, SLEEP_TABLE,
};
