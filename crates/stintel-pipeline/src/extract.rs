//! Structured-data extraction from free-form model output.
//!
//! Extraction and validation are separate phases:
//! [`extract_json_object`] locates and parses one JSON object, and
//! [`normalize_payload`] coerces it into the canonical
//! [`AnalysisPayload`] shape. [`parse_analysis`] composes both and never fails.

use std::sync::LazyLock;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde_json::Value;
use stintel_core::{AnalysisItem, AnalysisLimits, AnalysisPayload};
use thiserror::Error;

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(.*?)```").expect("valid regex"));

// Optional language tag on the opening fence line is skipped.
static ANY_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:[A-Za-z0-9_+.-]*[ \t]*\r?\n)?(.*?)```").expect("valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionFailure {
    #[error("no JSON object found in response")]
    NotFound,

    #[error("candidate JSON did not parse: {0}")]
    Parse(String),

    #[error("top-level JSON value is not an object")]
    NotAnObject,
}

/// Pick the candidate JSON text: a ```` ```json ```` fence, then any fence,
/// then the span from the first `{` to the last `}`.
fn candidate(text: &str) -> Option<&str> {
    if let Some(m) = JSON_FENCE.captures(text).and_then(|c| c.get(1)) {
        return Some(m.as_str());
    }
    if let Some(m) = ANY_FENCE.captures(text).and_then(|c| c.get(1)) {
        return Some(m.as_str());
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Locate and parse the single JSON object embedded in `text`.
///
/// # Errors
///
/// - [`ExtractionFailure::NotFound`] when no candidate span exists.
/// - [`ExtractionFailure::Parse`] when the candidate is not valid JSON.
/// - [`ExtractionFailure::NotAnObject`] when it parses to a non-object.
pub fn extract_json_object(text: &str) -> Result<Value, ExtractionFailure> {
    let raw = candidate(text).ok_or(ExtractionFailure::NotFound)?;
    let value: Value =
        serde_json::from_str(raw.trim()).map_err(|e| ExtractionFailure::Parse(e.to_string()))?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(ExtractionFailure::NotAnObject)
    }
}

fn normalize_list(
    value: Option<&Value>,
    cap: usize,
    stamp: &str,
) -> Vec<AnalysisItem> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_object)
        .take(cap)
        .map(|item| {
            let mut item = item.clone();
            item.entry("created_at")
                .or_insert_with(|| Value::String(stamp.to_string()));
            item
        })
        .collect()
}

/// Coerce an extracted object into the canonical four-list payload.
///
/// Unknown keys are ignored, missing or non-array lists become empty,
/// non-object items are dropped, each list is truncated to its cap, and
/// items without `created_at` are stamped with `now`.
#[must_use]
pub fn normalize_payload(value: &Value, limits: AnalysisLimits, now: DateTime<Utc>) -> AnalysisPayload {
    let stamp = now.to_rfc3339_opts(SecondsFormat::Secs, true);
    AnalysisPayload {
        trends: normalize_list(value.get("trends"), limits.trends, &stamp),
        competitor_moves: normalize_list(
            value.get("competitor_moves"),
            limits.competitor_moves,
            &stamp,
        ),
        opportunities_for_founders: normalize_list(
            value.get("opportunities_for_founders"),
            limits.opportunities_for_founders,
            &stamp,
        ),
        opportunities_for_investors: normalize_list(
            value.get("opportunities_for_investors"),
            limits.opportunities_for_investors,
            &stamp,
        ),
    }
}

/// Extract and normalize; any failure yields the canonical empty payload.
#[must_use]
pub fn parse_analysis(text: &str, limits: AnalysisLimits, now: DateTime<Utc>) -> AnalysisPayload {
    match extract_json_object(text) {
        Ok(value) => normalize_payload(&value, limits, now),
        Err(e) => {
            tracing::warn!(error = %e, chars = text.len(), "extract: falling back to empty analysis");
            AnalysisPayload::default()
        }
    }
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
