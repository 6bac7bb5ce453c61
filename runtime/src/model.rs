//! Rating records and the audience segments they are scraped for.

use chrono::Local;
use serde::{Deserialize, Serialize};

/// Timestamp layout written into every record: local clock, second precision.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// One scraped rating summary for one segment.
///
/// Field order is the on-disk key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    /// Capture time, shared by every segment of one run.
    pub timestamp: String,
    pub average_rating: f64,
    pub liked_count: u64,
    pub not_liked_count: u64,
    /// Total number of ratings.
    pub rating_count: u64,
    /// Total number of written reviews.
    pub review_count: u64,
    /// The displayed aggregate score, e.g. a percentage.
    pub value: i64,
}

/// A named rating widget on the page and the log it is written to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Segment {
    /// Short name, e.g. "critics".
    pub name: String,
    /// Element name of the widget carrying the rating attributes.
    pub tag: String,
    /// Log file name, relative to the output directory.
    pub file: String,
}

impl Segment {
    pub fn new(name: &str, tag: &str, file: &str) -> Self {
        Self {
            name: name.to_string(),
            tag: tag.to_string(),
            file: file.to_string(),
        }
    }

    pub fn critics() -> Self {
        Self::new("critics", "score-details-critics-deprecated", "critics.json")
    }

    pub fn audience() -> Self {
        Self::new(
            "audience",
            "score-details-audience-deprecated",
            "audience.json",
        )
    }

    /// The critic and audience segments, in write order.
    pub fn defaults() -> Vec<Self> {
        vec![Self::critics(), Self::audience()]
    }
}

/// Current local time in [`TIMESTAMP_FORMAT`].
pub fn capture_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}
