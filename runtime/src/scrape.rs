//! One scrape run: render once, extract every segment, log them together.

use crate::config::TrackerConfig;
use crate::error::Result;
use crate::extract::extract;
use crate::model::{capture_timestamp, RatingRecord, Segment};
use crate::renderer::Renderer;
use crate::store::LogStore;
use scraper::Html;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

/// What one run captured and where it was written.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeReport {
    pub url: String,
    pub timestamp: String,
    pub segments: Vec<SegmentReport>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentReport {
    pub segment: String,
    pub file: PathBuf,
    pub record: RatingRecord,
}

/// Scrape `config.url` and append one record per segment.
///
/// Nothing is written unless rendering and every extraction succeed, and
/// all segment logs are committed as one unit.
pub async fn run(
    config: &TrackerConfig,
    renderer: &dyn Renderer,
    store: &LogStore,
) -> Result<ScrapeReport> {
    run_at(config, renderer, store, capture_timestamp()).await
}

/// [`run`] with a caller-chosen capture timestamp.
pub async fn run_at(
    config: &TrackerConfig,
    renderer: &dyn Renderer,
    store: &LogStore,
    timestamp: String,
) -> Result<ScrapeReport> {
    let start = Instant::now();
    info!(url = %config.url, %timestamp, "scraping");

    let html = renderer
        .render(&config.url, &config.wait_strategy())
        .await?;
    debug!(bytes = html.len(), "page rendered");

    let records = extract_segments(&html, &config.segments, &timestamp)?;

    let entries: Vec<(&str, &RatingRecord)> = records
        .iter()
        .map(|(seg, record)| (seg.file.as_str(), record))
        .collect();
    store.append_all(&entries)?;

    let segments = records
        .into_iter()
        .map(|(seg, record)| {
            info!(
                segment = %seg.name,
                value = record.value,
                average_rating = record.average_rating,
                rating_count = record.rating_count,
                "recorded"
            );
            SegmentReport {
                segment: seg.name.clone(),
                file: store.path_of(&seg.file),
                record,
            }
        })
        .collect();

    Ok(ScrapeReport {
        url: config.url.clone(),
        timestamp,
        segments,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Extract every segment from one parsed document, all stamped `timestamp`.
pub fn extract_segments<'a>(
    html: &str,
    segments: &'a [Segment],
    timestamp: &str,
) -> Result<Vec<(&'a Segment, RatingRecord)>> {
    let document = Html::parse_document(html);
    segments
        .iter()
        .map(|seg| extract(&document, &seg.tag, timestamp).map(|record| (seg, record)))
        .collect()
}
