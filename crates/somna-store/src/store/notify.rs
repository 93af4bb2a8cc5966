//! ChangeNotifier - broadcast-based table change notifications.
//!
//! Writers publish a [`TableChange`] after their transaction commits;
//! live queries subscribe and re-run when their table changes.

use serde::Serialize;
use tokio::sync::broadcast;

/// Default notification buffer
const DEFAULT_CAPACITY: usize = 256;

/// What kind of write changed a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// A row was inserted or replaced
    Insert,
    /// A single row was removed
    Delete,
    /// Every row was removed
    Clear,
}

impl ChangeKind {
    /// Returns the string representation of the change kind
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Delete => "delete",
            Self::Clear => "clear",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A committed change to a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableChange {
    /// Name of the changed table
    pub table: &'static str,
    /// Kind of write
    pub kind: ChangeKind,
}

impl TableChange {
    /// Create a change event for a table
    #[must_use]
    pub fn new(table: &'static str, kind: ChangeKind) -> Self {
        Self { table, kind }
    }
}

/// Broadcast-based change notifier keyed by table name.
///
/// Slow subscribers lag (and are told so on their next receive) rather
/// than blocking writers.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<TableChange>,
}

impl ChangeNotifier {
    /// Create a notifier with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to changes published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TableChange> {
        self.sender.subscribe()
    }

    /// Publish a change to all active subscribers.
    ///
    /// Returns the number of subscribers that received it; 0 when nobody listens.
    pub fn publish(&self, change: TableChange) -> usize {
        self.sender.send(change).unwrap_or(0)
    }

    /// Get the current number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
