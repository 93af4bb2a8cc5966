//! `somna watch` - follow the sleep history live

use super::records::print_records;
use anyhow::Result;
use chrono::{DateTime, Utc};
use somna_store::{SleepRepository, SleepStore};
use tracing::{info, warn};

pub async fn run(repo: &SleepRepository<SleepStore>, since: Option<DateTime<Utc>>) -> Result<()> {
    let mut live = match since {
        Some(start) => repo.store().get_sleep_data_from_date(start),
        None => repo.sleep_history(),
    };

    info!("Watching sleep history (Ctrl-C to stop)");
    let mut delivered = 0usize;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping watch after {} snapshot(s)", delivered);
                break;
            }
            item = live.next() => match item {
                Some(Ok(records)) => {
                    delivered += 1;
                    println!(
                        "--- snapshot {delivered} at {} ({} records)",
                        Utc::now().format("%H:%M:%S"),
                        records.len()
                    );
                    print_records(&records, false)?;
                }
                Some(Err(e)) if e.is_corruption() => {
                    warn!("Stored data is corrupted: {}", e);
                }
                Some(Err(e)) => {
                    warn!("Snapshot failed: {}", e);
                }
                None => break,
            }
        }
    }

    live.unsubscribe();
    Ok(())
}
