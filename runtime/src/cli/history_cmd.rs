//! `tomato-tracker history <segment>` — show recent records from a log.

use crate::cli::output;
use crate::config::TrackerConfig;
use crate::model::RatingRecord;
use crate::store::LogStore;
use anyhow::{bail, Result};
use std::path::Path;
use tracing::warn;

/// Print the newest `limit` records of `segment`, oldest first.
pub fn run(
    segment: &str,
    limit: usize,
    config_path: Option<&Path>,
    output_dir: Option<&Path>,
) -> Result<()> {
    let config = TrackerConfig::load(config_path)?;
    let Some(seg) = config.segment(segment) else {
        let known: Vec<&str> = config.segments.iter().map(|s| s.name.as_str()).collect();
        bail!("unknown segment {segment:?} (configured: {})", known.join(", "));
    };

    let store = LogStore::new(output_dir.unwrap_or(&config.output_dir));
    let scan = store.scan(&seg.file)?;
    if scan.skipped > 0 {
        warn!(
            path = %store.path_of(&seg.file).display(),
            skipped = scan.skipped,
            "log has entries that are not rating records"
        );
    }
    let records = scan.records;
    let recent = tail(&records, limit);

    if output::is_json() {
        output::print_json(recent);
        return Ok(());
    }

    if recent.is_empty() {
        println!("No records in {}", store.path_of(&seg.file).display());
        return Ok(());
    }

    println!(
        "{:<20} {:>6} {:>7} {:>9} {:>9} {:>9} {:>8}",
        "TIMESTAMP", "VALUE", "AVG", "LIKED", "NOT LIKED", "RATINGS", "REVIEWS"
    );
    for r in recent {
        println!(
            "{:<20} {:>6} {:>7} {:>9} {:>9} {:>9} {:>8}",
            r.timestamp,
            r.value,
            r.average_rating,
            r.liked_count,
            r.not_liked_count,
            r.rating_count,
            r.review_count
        );
    }
    if !output::is_quiet() {
        if records.len() > recent.len() {
            println!("({} of {} records)", recent.len(), records.len());
        }
        if scan.skipped > 0 {
            println!("({} non-record entries skipped)", scan.skipped);
        }
    }
    Ok(())
}

/// The last `limit` records; `0` means all of them.
fn tail(records: &[RatingRecord], limit: usize) -> &[RatingRecord] {
    if limit == 0 || limit >= records.len() {
        records
    } else {
        &records[records.len() - limit..]
    }
}
