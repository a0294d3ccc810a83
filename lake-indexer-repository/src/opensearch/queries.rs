//! OpenSearch query builders and response readers.
//!
//! The pipeline issues only a handful of query shapes: a max aggregation on
//! the event time for watermarking, date range matches on `time_dt` for
//! retention, and counts. Builders and the matching response readers live
//! together here.

use serde_json::{json, Value};

use crate::errors::SearchIndexError;
use crate::types::{BulkItemFailure, BulkOperationSummary, RangePage};

/// Name of the aggregation used for watermark lookups.
pub const MAX_AGGREGATION: &str = "max_time";

/// Bound of a date range query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound<'a> {
    /// Strictly older than the expression.
    Before(&'a str),
    /// At or after the expression.
    Since(&'a str),
}

/// Build a size-0 search that returns the maximum of `field`.
pub fn max_aggregation_query(field: &str) -> Value {
    json!({
        "size": 0,
        "aggs": {
            MAX_AGGREGATION: {
                "max": { "field": field }
            }
        }
    })
}

/// Build a range query on a date field.
///
/// The bound may be an absolute date or a date math expression such as
/// `now-5d/d`; the backend resolves it.
pub fn date_range_query(field: &str, bound: DateBound<'_>) -> Value {
    let range = match bound {
        DateBound::Before(expr) => json!({ "lt": expr }),
        DateBound::Since(expr) => json!({ "gte": expr }),
    };
    json!({
        "query": {
            "range": { field: range }
        }
    })
}

/// Build a page request for documents matched by a date range, ids only.
pub fn date_range_page_query(field: &str, bound: DateBound<'_>, size: usize) -> Value {
    let mut body = date_range_query(field, bound);
    body["size"] = json!(size);
    body["_source"] = json!(false);
    body
}

/// Read the value of the max aggregation. `None` when the index holds no
/// documents with the field.
pub fn parse_max_aggregation(response: &Value) -> Option<f64> {
    response["aggregations"][MAX_AGGREGATION]["value"].as_f64()
}

/// Read the total and the ids of a search response.
pub fn parse_range_page(response: &Value) -> Result<RangePage, SearchIndexError> {
    let hits = response
        .get("hits")
        .ok_or_else(|| SearchIndexError::parse("search response has no hits"))?;

    // `hits.total` is an object on current versions and a number on old ones.
    let total_matched = match &hits["total"] {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        other => other["value"].as_u64().unwrap_or(0),
    };

    let ids = hits["hits"]
        .as_array()
        .map(|hits| {
            hits.iter()
                .filter_map(|hit| hit["_id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    Ok(RangePage { total_matched, ids })
}

/// Read a `_count` response.
pub fn parse_count(response: &Value) -> Result<u64, SearchIndexError> {
    response["count"]
        .as_u64()
        .ok_or_else(|| SearchIndexError::parse("count response has no count"))
}

/// Summarize a `_bulk` response.
pub fn parse_bulk_response(response: &Value) -> BulkOperationSummary {
    let took_ms = response["took"].as_u64().unwrap_or(0);
    let errors = response["errors"].as_bool().unwrap_or(false);
    let items = response["items"].as_array().cloned().unwrap_or_default();

    let mut failures = Vec::new();
    for (position, item) in items.iter().enumerate() {
        // Each item is keyed by its action: {"create": {...}} or {"delete": {...}}.
        let Some(outcome) = item.as_object().and_then(|o| o.values().next()) else {
            continue;
        };
        let status = outcome["status"].as_u64().unwrap_or(0) as u16;
        let failed = outcome.get("error").is_some_and(|e| !e.is_null())
            || !(200..300).contains(&status);
        // A delete of an already-gone document is not a failure.
        let not_found = status == 404 && outcome["result"] == "not_found";
        if failed && !not_found {
            let reason = outcome["error"]["reason"]
                .as_str()
                .or_else(|| outcome["error"].as_str())
                .map(str::to_string);
            failures.push(BulkItemFailure {
                position,
                status,
                reason,
            });
        }
    }

    BulkOperationSummary {
        took_ms,
        total: items.len(),
        succeeded: items.len() - failures.len(),
        failed: failures.len(),
        errors,
        failures,
    }
}
