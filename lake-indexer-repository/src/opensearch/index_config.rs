//! OpenSearch index configuration and mappings.
//!
//! Every telemetry index shares the same vector-search layout: a knn-enabled
//! index with one `embedding_vector` field and two date fields, `time` and
//! `time_dt`. Families contribute their own field declarations on top.

use serde_json::{json, Map, Value};

/// Field holding the document embedding.
pub const EMBEDDING_FIELD: &str = "embedding_vector";

/// Epoch-millisecond event time, used for watermarks.
pub const TIME_FIELD: &str = "time";

/// ISO-8601 event time, used for retention.
pub const TIME_DT_FIELD: &str = "time_dt";

/// Mapping of the knn vector field.
///
/// - **hnsw** approximate nearest neighbour graph
/// - **cosinesimil** similarity
/// - **nmslib** engine
pub fn embedding_field_mapping(dimension: usize) -> Value {
    json!({
        "type": "knn_vector",
        "dimension": dimension,
        "method": {
            "name": "hnsw",
            "space_type": "cosinesimil",
            "engine": "nmslib"
        }
    })
}

/// Build the full create-index body for a telemetry index.
///
/// `family_properties` is an object of field declarations. The vector field
/// and both time fields are always declared and override entries of the same
/// name.
pub fn knn_index_settings(family_properties: Value, dimension: usize) -> Value {
    let mut properties = match family_properties {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    properties.insert(EMBEDDING_FIELD.to_string(), embedding_field_mapping(dimension));
    properties.insert(
        TIME_FIELD.to_string(),
        json!({
            "type": "date",
            "format": "strict_date_optional_time||epoch_millis"
        }),
    );
    properties.insert(
        TIME_DT_FIELD.to_string(),
        json!({
            "type": "date",
            "format": "strict_date_optional_time"
        }),
    );

    json!({
        "settings": {
            "index.knn": true
        },
        "mappings": {
            "properties": properties
        }
    })
}
