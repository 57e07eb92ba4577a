use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};

use super::args::HistoryCliArgs;
use crate::call::CallRecord;
use crate::config::Config;
use crate::global;
use crate::history::{self, HistoryQuery, HistoryStore, SqliteHistory};
use crate::text_io::NumberClipboard;

pub fn handle_history_command(args: HistoryCliArgs) -> Result<()> {
    let config = Config::load()?;
    let store = SqliteHistory::open_default(config.history.max_entries)?;

    if let Some(path) = args.json.as_deref() {
        let records = store.list()?;
        history::export_json(&records, path)?;
        println!("Exported {} call(s) to {}", records.len(), path.display());
        return Ok(());
    }

    if let Some(id) = args.export {
        let record = find_call(&store, id)?;
        let dir = match args.out {
            Some(dir) => dir,
            None => global::recordings_dir()?,
        };
        let path = history::export_audio(&record, &dir)?;
        println!("Saved recording of call #{} to {}", id, path.display());
        return Ok(());
    }

    if let Some(id) = args.play {
        let record = find_call(&store, id)?;
        println!("Playing call #{} with {} ...", id, record.number);
        return history::play_record(&record, config.history.player_command.as_deref());
    }

    if let Some(id) = args.copy {
        let record = find_call(&store, id)?;
        NumberClipboard::new().copy(&record.number)?;
        println!("Copied {} to clipboard", record.number);
        return Ok(());
    }

    let mut query = HistoryQuery::new().with_limit(args.limit);
    query.number = args.number;
    query.direction = args.direction.map(Into::into);

    let records = store.search(&query)?;
    if records.is_empty() {
        if query.has_filters() {
            println!("No calls found matching your criteria.");
        } else {
            println!("No calls yet");
        }
        return Ok(());
    }

    println!("Found {} of {} call(s):\n", records.len(), store.count()?);
    print_history(&records);
    println!("\nTo play a recording, use: softdial history --play <ID>");

    Ok(())
}

fn find_call(store: &SqliteHistory, id: i64) -> Result<CallRecord> {
    store
        .get(id)?
        .ok_or_else(|| anyhow!("Call with ID {} not found", id))
}

pub fn format_timestamp(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

pub fn print_history(records: &[CallRecord]) {
    for record in records {
        println!("ID: {}", record.id);
        println!("Number: {} ({})", record.number, record.direction.as_str());
        println!(
            "Date: {} • {}s",
            format_timestamp(record.start),
            record.duration_seconds()
        );
        match &record.audio {
            Some(audio) => println!("Recording: {} ({} bytes)", audio.mime, audio.bytes.len()),
            None => println!("Recording: none"),
        }
        println!("---");
    }
}
