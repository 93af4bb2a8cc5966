//! Data management CLI commands
//!
//! `somna stats`  - show record count and file size
//! `somna clear`  - delete every sleep record

use anyhow::Result;
use somna_store::{SleepRepository, SleepStore};
use std::path::Path;

fn file_size_display(path: &Path) -> String {
    match std::fs::metadata(path) {
        Ok(m) => format_bytes(m.len()),
        Err(_) => "-".to_string(),
    }
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

fn confirm(prompt: &str) -> bool {
    use std::io::{self, Write};
    print!("{prompt} [y/N] ");
    io::stdout().flush().ok();
    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_ok() {
        matches!(input.trim(), "y" | "Y" | "yes" | "YES")
    } else {
        false
    }
}

pub async fn stats(repo: &SleepRepository<SleepStore>) -> Result<()> {
    let store = repo.store();
    let count = store.count().await?;
    let latest = repo.latest_sleep_data().await?;

    match store.db_path() {
        Some(path) => {
            println!("Database:  {}", path.display());
            println!("Size:      {}", file_size_display(path));
        }
        None => println!("Database:  (in memory)"),
    }
    println!("Records:   {count}");
    match latest {
        Some(record) => println!(
            "Latest:    {} ({:.2} h)",
            record.date.to_rfc3339(),
            record.duration
        ),
        None => println!("Latest:    -"),
    }
    Ok(())
}

pub async fn clear(repo: &SleepRepository<SleepStore>, force: bool) -> Result<()> {
    if !force && !confirm("Delete all sleep records?") {
        println!("Aborted.");
        return Ok(());
    }

    let removed = repo.clear_history().await?;
    println!("Deleted {removed} sleep record(s).");
    Ok(())
}
