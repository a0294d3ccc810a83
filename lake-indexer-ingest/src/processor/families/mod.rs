//! Telemetry family profiles.
//!
//! A profile bundles everything that differs between families: the columns
//! the source query selects and how it narrows the window, the destination
//! mapping, the row mapper and the embedding text. The orchestrator only
//! ever talks to [`TelemetryFamily`].

mod cloud_trail;
mod lambda;
mod route53;
mod s3_data;
mod security_hub;
mod vpc_flow;

pub use cloud_trail::CloudTrail;
pub use lambda::Lambda;
pub use route53::Route53;
pub use s3_data::S3Data;
pub use security_hub::SecurityHub;
pub use vpc_flow::VpcFlow;

use serde_json::{json, Map, Value};

use lake_indexer_repository::opensearch::index_config::knn_index_settings;
use lake_indexer_shared::{Document, Family, RawRow, Watermark, EMBEDDING_DIMENSION};

use crate::errors::RowError;
use crate::loader::WriteMode;

/// Family-specific behavior of the pipeline.
pub trait TelemetryFamily: Send + Sync {
    /// The family this profile describes.
    fn family(&self) -> Family;

    /// Select list of the source query.
    fn select_list(&self) -> &'static [&'static str];

    /// Extra condition narrowing every extraction window.
    fn window_filter(&self) -> Option<&'static str> {
        None
    }

    /// How documents are written.
    fn write_mode(&self) -> WriteMode;

    /// Field declarations of the destination index.
    fn index_properties(&self) -> Value;

    /// Map one result row into a document.
    fn map_row(&self, row: &RawRow) -> Result<Document, RowError>;

    /// Summary text the embedding is computed from.
    fn embedding_text(&self, document: &Document) -> Result<String, RowError>;

    /// Render the source query for one extraction window.
    ///
    /// Rows are strictly newer than `watermark` and come oldest first, capped
    /// at `limit`.
    fn source_query(&self, table: &str, watermark: Option<Watermark>, limit: usize) -> String {
        let mut conditions = Vec::new();
        if let Some(watermark) = watermark {
            conditions.push(format!("time > {}", watermark));
        }
        if let Some(filter) = self.window_filter() {
            conditions.push(filter.to_string());
        }

        let mut query = format!("SELECT {} FROM {}", self.select_list().join(", "), table);
        if !conditions.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&conditions.join(" AND "));
        }
        query.push_str(&format!(" ORDER BY time ASC LIMIT {}", limit));
        query
    }

    /// Create-index body of the destination index.
    fn index_settings(&self) -> Value {
        knn_index_settings(self.index_properties(), EMBEDDING_DIMENSION)
    }
}

static CLOUD_TRAIL: CloudTrail = CloudTrail;
static SECURITY_HUB: SecurityHub = SecurityHub;
static LAMBDA: Lambda = Lambda;
static ROUTE53: Route53 = Route53;
static S3_DATA: S3Data = S3Data;
static VPC_FLOW: VpcFlow = VpcFlow;

/// The profile of a family.
pub fn family_profile(family: Family) -> &'static dyn TelemetryFamily {
    match family {
        Family::CloudTrail => &CLOUD_TRAIL,
        Family::SecurityHub => &SECURITY_HUB,
        Family::Lambda => &LAMBDA,
        Family::Route53 => &ROUTE53,
        Family::S3Data => &S3_DATA,
        Family::VpcFlow => &VPC_FLOW,
    }
}

/// Build a properties object from `(field, type)` pairs.
fn properties(fields: &[(&str, &str)]) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, kind)| (name.to_string(), json!({ "type": kind })))
        .collect()
}

/// Properties of the envelope fields, with `label` as the type of the
/// descriptive name fields.
fn envelope_properties(label: &str) -> Map<String, Value> {
    properties(&[
        ("class_name", label),
        ("class_uid", "integer"),
        ("category_name", label),
        ("category_uid", "integer"),
        ("severity", label),
        ("severity_id", "integer"),
        ("type_name", label),
        ("type_uid", "integer"),
        ("activity_name", label),
        ("activity_id", "integer"),
        ("accountid", "keyword"),
        ("region", "keyword"),
        ("asl_version", "keyword"),
        ("cloud", "object"),
        ("observables", "object"),
        ("unmapped", "object"),
    ])
}

/// Merge envelope and family properties into one mapping object.
fn merged_properties(label: &str, family: &[(&str, &str)]) -> Value {
    let mut merged = envelope_properties(label);
    merged.extend(properties(family));
    Value::Object(merged)
}

fn mismatch(expected: Family, document: &Document) -> RowError {
    RowError::FamilyMismatch {
        expected,
        found: document.family(),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_match_families() {
        for family in Family::ALL {
            assert_eq!(family_profile(family).family(), family);
        }
    }

    #[test]
    fn test_source_query_first_window() {
        let query = family_profile(Family::CloudTrail).source_query("ct_table", None, 1000);
        assert!(query.starts_with("SELECT class_name, "));
        assert!(query.ends_with(" FROM ct_table ORDER BY time ASC LIMIT 1000"));
        assert!(!query.contains("WHERE"));
    }

    #[test]
    fn test_source_query_with_watermark_and_filter() {
        let query =
            family_profile(Family::VpcFlow).source_query("vpc_table", Some(1_714_564_800_000), 50);
        assert!(query.contains(
            " FROM vpc_table WHERE time > 1714564800000 AND (src_endpoint.port IN (22, 3389) OR dst_endpoint.port IN (22, 3389)) ORDER BY time ASC LIMIT 50"
        ));
    }

    #[test]
    fn test_filter_without_watermark() {
        let query = family_profile(Family::S3Data).source_query("s3_table", None, 10);
        assert!(query.contains(" WHERE http_request.user_agent != 'athena.amazonaws.com' ORDER BY"));
    }

    #[test]
    fn test_every_select_list_carries_time_columns() {
        for family in Family::ALL {
            let select = family_profile(family).select_list();
            assert!(select.contains(&"time"), "{} lacks time", family);
            assert!(
                select.iter().any(|c| c.ends_with(" AS time_dt")),
                "{} lacks time_dt",
                family
            );
        }
    }

    #[test]
    fn test_index_settings_are_knn() {
        for family in Family::ALL {
            let settings = family_profile(family).index_settings();
            let props = &settings["mappings"]["properties"];
            assert_eq!(props["embedding_vector"]["dimension"], EMBEDDING_DIMENSION);
            assert_eq!(props["time_dt"]["type"], "date");
            assert_eq!(props["class_uid"]["type"], "integer");
        }
    }

    #[test]
    fn test_write_modes() {
        assert_eq!(family_profile(Family::SecurityHub).write_mode(), WriteMode::Batched);
        assert_eq!(family_profile(Family::Lambda).write_mode(), WriteMode::Batched);
        assert_eq!(family_profile(Family::S3Data).write_mode(), WriteMode::Batched);
        assert_eq!(family_profile(Family::CloudTrail).write_mode(), WriteMode::PerDocument);
        assert_eq!(family_profile(Family::Route53).write_mode(), WriteMode::PerDocument);
        assert_eq!(family_profile(Family::VpcFlow).write_mode(), WriteMode::PerDocument);
    }

    #[test]
    fn test_envelope_only_row_is_rejected() {
        let row = fixtures::row(&[]);
        for family in Family::ALL {
            assert!(matches!(
                family_profile(family).map_row(&row),
                Err(RowError::MissingColumn(_))
            ));
        }
    }

    #[test]
    fn test_embedding_text_rejects_other_family() {
        let vpc = family_profile(Family::VpcFlow);
        let doc = Document::new(
            lake_indexer_shared::Envelope::at(1, "1970-01-01T00:00:00.001Z"),
            lake_indexer_shared::CloudTrailRecord::default(),
        );
        assert!(matches!(
            vpc.embedding_text(&doc),
            Err(RowError::FamilyMismatch {
                expected: Family::VpcFlow,
                found: Family::CloudTrail
            })
        ));
    }
}
