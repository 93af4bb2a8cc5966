//! LiveQuery - re-evaluated query subscriptions
//!
//! A live query owns a background task that re-runs its query whenever the
//! sleep table changes and pushes each fresh snapshot to the handle.
//! Dropping the handle stops the task.

use super::notify::TableChange;
use super::sleep_store::{fetch_all, fetch_from_date, SLEEP_TABLE};
use crate::error::{Error, Result};
use crate::record::SleepRecord;
use sqlx::sqlite::SqlitePool;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};

/// The query a subscription re-runs
#[derive(Debug, Clone, Copy)]
pub(crate) enum SnapshotQuery {
    /// Every record, newest first
    All,
    /// Records with `date >= millis`, newest first
    FromDate(i64),
}

impl SnapshotQuery {
    async fn run(&self, pool: &SqlitePool) -> Result<Vec<SleepRecord>> {
        match self {
            Self::All => fetch_all(pool).await,
            Self::FromDate(millis) => fetch_from_date(pool, *millis).await,
        }
    }
}

/// Subscription handle for a query that is re-delivered on every table change.
///
/// Each item is a fully materialised snapshot, newest record first. Bursts of
/// writes may be coalesced into a single snapshot, but every snapshot is at
/// least as recent as the write that triggered it.
pub struct LiveQuery {
    receiver: mpsc::Receiver<Result<Vec<SleepRecord>>>,
    _guard: DropGuard,
}

impl LiveQuery {
    /// Start a subscription.
    ///
    /// `changes` must be subscribed before this call so that writes racing
    /// with the first evaluation still trigger a re-query.
    pub(crate) fn spawn(
        pool: SqlitePool,
        query: SnapshotQuery,
        changes: broadcast::Receiver<TableChange>,
        buffer: usize,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let cancel = CancellationToken::new();

        tokio::spawn(run_subscription(
            pool,
            query,
            changes,
            sender,
            cancel.clone(),
        ));

        Self {
            receiver,
            _guard: cancel.drop_guard(),
        }
    }

    /// Wait for the next snapshot.
    ///
    /// Returns `None` once the subscription has ended.
    pub async fn next(&mut self) -> Option<Result<Vec<SleepRecord>>> {
        self.receiver.recv().await
    }

    /// Return the newest snapshot already delivered, discarding older ones.
    pub fn try_latest(&mut self) -> Option<Result<Vec<SleepRecord>>> {
        let mut latest = None;
        while let Ok(item) = self.receiver.try_recv() {
            latest = Some(item);
        }
        latest
    }

    /// Stop receiving snapshots.
    pub fn unsubscribe(self) {
        debug!("Live query unsubscribed");
    }
}

impl std::fmt::Debug for LiveQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveQuery")
            .field("closed", &self.receiver.is_closed())
            .finish()
    }
}

async fn run_subscription(
    pool: SqlitePool,
    query: SnapshotQuery,
    mut changes: broadcast::Receiver<TableChange>,
    sender: mpsc::Sender<Result<Vec<SleepRecord>>>,
    cancel: CancellationToken,
) {
    if !deliver(&sender, &cancel, query.run(&pool).await).await {
        return;
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            change = changes.recv() => match change {
                Ok(change) if change.table != SLEEP_TABLE => continue,
                Ok(change) => debug!("Re-running {:?} after {}", query, change.kind),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Live query lagged behind {} changes, re-running", skipped);
                }
                Err(RecvError::Closed) => {
                    deliver(&sender, &cancel, Err(Error::Closed)).await;
                    break;
                }
            }
        }

        // coalesce whatever else is already queued into this re-run
        loop {
            match changes.try_recv() {
                Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        if !deliver(&sender, &cancel, query.run(&pool).await).await {
            break;
        }
    }

    debug!("Live query task stopped");
}

/// Push one item to the subscriber; false once the subscriber is gone
async fn deliver(
    sender: &mpsc::Sender<Result<Vec<SleepRecord>>>,
    cancel: &CancellationToken,
    item: Result<Vec<SleepRecord>>,
) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        sent = sender.send(item) => sent.is_ok(),
    }
}
