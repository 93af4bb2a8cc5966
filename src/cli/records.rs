//! Record management CLI commands
//!
//! `somna add`, `somna list`, `somna latest`, `somna delete`

use super::AddArgs;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use somna_store::{estimate_quality, LiveQuery, SleepRecord, SleepRepository, SleepStore};
use tracing::info;

/// Header matching [`format_record`] columns
pub const TABLE_HEADER: &str =
    "    ID  DATE (UTC)          HOURS  QUAL   HR  STEPS   DEEP  LIGHT    REM";

/// Render one record as a table row
pub fn format_record(record: &SleepRecord) -> String {
    format!(
        "{:>6}  {}  {:>5.2}  {:>4}  {:>3}  {:>5}  {:>5.2}  {:>5.2}  {:>5.2}",
        record.id,
        record.date.format("%Y-%m-%d %H:%M"),
        record.duration,
        record.quality,
        record.heart_rate,
        record.step_count,
        record.deep_sleep_duration,
        record.light_sleep_duration,
        record.rem_sleep_duration,
    )
}

/// Print records as a table or as JSON
pub fn print_records(records: &[SleepRecord], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No sleep records.");
        return Ok(());
    }

    println!("{TABLE_HEADER}");
    for record in records {
        println!("{}", format_record(record));
    }
    Ok(())
}

/// Build the record described by `args`
pub fn record_from_args(args: &AddArgs) -> SleepRecord {
    let quality = args
        .quality
        .unwrap_or_else(|| estimate_quality(args.heart_rate, args.steps, args.duration));

    SleepRecord::new(args.date, args.duration)
        .with_id(args.id)
        .with_vitals(quality, args.heart_rate, args.steps)
        .with_stages(args.deep, args.light, args.rem)
}

pub async fn add(repo: &SleepRepository<SleepStore>, args: AddArgs) -> Result<()> {
    let record = record_from_args(&args);
    let id = repo.save_sleep_data(&record).await?;
    info!("Saved sleep record {}", id);
    println!("Saved sleep record {id} (quality {}%)", record.quality);
    Ok(())
}

/// First snapshot of a subscription, then unsubscribe
async fn first_snapshot(mut live: LiveQuery) -> Result<Vec<SleepRecord>> {
    let snapshot = live
        .next()
        .await
        .ok_or_else(|| anyhow!("subscription ended before delivering a snapshot"))?
        .context("Failed to read sleep records")?;
    live.unsubscribe();
    Ok(snapshot)
}

pub async fn list(
    repo: &SleepRepository<SleepStore>,
    since: Option<DateTime<Utc>>,
    json: bool,
) -> Result<()> {
    let live = match since {
        Some(start) => repo.store().get_sleep_data_from_date(start),
        None => repo.sleep_history(),
    };
    let records = first_snapshot(live).await?;
    print_records(&records, json)
}

pub async fn latest(repo: &SleepRepository<SleepStore>, json: bool) -> Result<()> {
    match repo.latest_sleep_data().await? {
        Some(record) => print_records(std::slice::from_ref(&record), json),
        None if json => {
            println!("null");
            Ok(())
        }
        None => {
            println!("No sleep records.");
            Ok(())
        }
    }
}

pub async fn delete(repo: &SleepRepository<SleepStore>, id: i64) -> Result<()> {
    let removed = repo.store().delete_by_id(id).await?;
    if removed == 0 {
        println!("No sleep record with id {id}.");
    } else {
        println!("Deleted sleep record {id}.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn args(quality: Option<i32>) -> AddArgs {
        AddArgs {
            date: Utc.with_ymd_and_hms(2024, 1, 2, 6, 45, 0).unwrap(),
            duration: 5.5,
            quality,
            heart_rate: 85,
            steps: 10,
            deep: 1.0,
            light: 3.0,
            rem: 1.5,
            id: 0,
        }
    }

    #[test]
    fn test_quality_is_estimated_when_missing() {
        let record = record_from_args(&args(None));
        assert_eq!(record.quality, estimate_quality(85, 10, 5.5));
        assert_eq!(record.quality, 70);
        assert!(record.is_unsaved());
    }

    #[test]
    fn test_explicit_quality_is_kept() {
        assert_eq!(record_from_args(&args(Some(93))).quality, 93);
    }

    #[test]
    fn test_format_record() {
        let record = record_from_args(&args(Some(93))).with_id(12);
        let row = format_record(&record);
        assert!(row.starts_with("    12  2024-01-02 06:45"));
        assert!(row.contains(" 5.50"));
        assert!(row.ends_with(" 1.50"));
    }
}
