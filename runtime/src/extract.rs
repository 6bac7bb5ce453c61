//! Pull rating summaries out of rendered HTML.
//!
//! The review page exposes each score widget as a custom element whose
//! attributes carry the raw numbers, e.g.
//! `<score-details-critics-deprecated averagerating="7.5" likedcount="120" ...>`.
//! Extraction reads those attributes with the `scraper` crate and refuses to
//! invent values: a missing element or attribute is an error, never a zero.

use crate::error::{Result, TrackerError};
use crate::model::RatingRecord;
use scraper::{ElementRef, Html, Selector};
use std::str::FromStr;

const AVERAGE_RATING: &str = "averagerating";
const LIKED_COUNT: &str = "likedcount";
const NOT_LIKED_COUNT: &str = "notlikedcount";
const RATING_COUNT: &str = "ratingcount";
const REVIEW_COUNT: &str = "reviewcount";
const VALUE: &str = "value";

/// Extract the rating summary carried by the first `tag` element in `document`.
///
/// `timestamp` is copied into the record verbatim so that every segment of
/// one scrape carries the same capture time.
pub fn extract(document: &Html, tag: &str, timestamp: &str) -> Result<RatingRecord> {
    let selector = tag_selector(tag)?;
    let element = document
        .select(&selector)
        .next()
        .ok_or_else(|| TrackerError::NotFound {
            tag: tag.to_string(),
        })?;

    Ok(RatingRecord {
        timestamp: timestamp.to_string(),
        average_rating: finite_attr(&element, tag, AVERAGE_RATING)?,
        liked_count: numeric_attr(&element, tag, LIKED_COUNT)?,
        not_liked_count: numeric_attr(&element, tag, NOT_LIKED_COUNT)?,
        rating_count: numeric_attr(&element, tag, RATING_COUNT)?,
        review_count: numeric_attr(&element, tag, REVIEW_COUNT)?,
        value: numeric_attr(&element, tag, VALUE)?,
    })
}

/// Parse `html` and run [`extract`] on it.
pub fn extract_html(html: &str, tag: &str, timestamp: &str) -> Result<RatingRecord> {
    extract(&Html::parse_document(html), tag, timestamp)
}

/// Build a type selector for a tag identifier.
///
/// Only bare element names are accepted; anything that would turn the
/// identifier into a compound selector is rejected up front.
pub fn tag_selector(tag: &str) -> Result<Selector> {
    let valid = !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(TrackerError::InvalidSelector {
            tag: tag.to_string(),
            reason: "expected a bare element name".to_string(),
        });
    }
    Selector::parse(tag).map_err(|e| TrackerError::InvalidSelector {
        tag: tag.to_string(),
        reason: format!("{e:?}"),
    })
}

fn numeric_attr<T: FromStr>(
    element: &ElementRef<'_>,
    tag: &str,
    attribute: &'static str,
) -> Result<T> {
    let raw = element
        .value()
        .attr(attribute)
        .ok_or_else(|| TrackerError::MissingAttribute {
            tag: tag.to_string(),
            attribute,
        })?;

    raw.trim().parse().map_err(|_| TrackerError::Coercion {
        tag: tag.to_string(),
        attribute,
        value: raw.to_string(),
    })
}

/// A float attribute that JSON can carry: `NaN` and infinities are rejected.
fn finite_attr(element: &ElementRef<'_>, tag: &str, attribute: &'static str) -> Result<f64> {
    let value: f64 = numeric_attr(element, tag, attribute)?;
    if value.is_finite() {
        return Ok(value);
    }
    Err(TrackerError::Coercion {
        tag: tag.to_string(),
        attribute,
        value: element.value().attr(attribute).unwrap_or_default().to_string(),
    })
}
