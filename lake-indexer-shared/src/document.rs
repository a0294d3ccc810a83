//! Documents written to the telemetry indices.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::family::Family;
use crate::records::FamilyRecord;

/// Fields shared by every telemetry family.
///
/// `time` is epoch milliseconds and `time_dt` is the same instant rendered as
/// ISO-8601. `time_dt` is the field used for retention and `time` the field
/// used for watermarking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub class_name: Option<String>,
    pub class_uid: Option<i64>,
    pub category_name: Option<String>,
    pub category_uid: Option<i64>,
    pub severity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity_id: Option<i64>,
    pub type_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_uid: Option<i64>,
    pub activity_name: Option<String>,
    pub activity_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accountid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub asl_version: Option<String>,
    pub time: i64,
    pub time_dt: String,
    pub cloud: Option<Value>,
    pub observables: Option<Value>,
    pub unmapped: Option<Value>,
}

impl Envelope {
    /// Envelope with only the timestamps set.
    pub fn at(time: i64, time_dt: impl Into<String>) -> Self {
        Self {
            class_name: None,
            class_uid: None,
            category_name: None,
            category_uid: None,
            severity: None,
            severity_id: None,
            type_name: None,
            type_uid: None,
            activity_name: None,
            activity_id: None,
            accountid: None,
            region: None,
            asl_version: None,
            time,
            time_dt: time_dt.into(),
            cloud: None,
            observables: None,
            unmapped: None,
        }
    }

    /// Render epoch milliseconds the way the query engine renders `time_dt`.
    pub fn format_time(time: i64) -> Option<String> {
        DateTime::<Utc>::from_timestamp_millis(time)
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

/// The canonical per-family record written to an index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    #[serde(flatten)]
    pub envelope: Envelope,
    #[serde(flatten)]
    pub record: FamilyRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_vector: Option<Vec<f32>>,
}

impl Document {
    /// Create a document that has not been enriched yet.
    pub fn new(envelope: Envelope, record: impl Into<FamilyRecord>) -> Self {
        Self {
            envelope,
            record: record.into(),
            embedding_vector: None,
        }
    }

    /// Family this document belongs to.
    pub fn family(&self) -> Family {
        self.record.family()
    }

    /// Epoch milliseconds of the underlying event.
    pub fn time(&self) -> i64 {
        self.envelope.time
    }

    /// Attach an embedding vector.
    pub fn with_embedding(mut self, vector: Vec<f32>) -> Self {
        self.embedding_vector = Some(vector);
        self
    }

    /// Serialize into the JSON body sent to the index.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
