//! CloudTrail management events.

use serde_json::Value;

use lake_indexer_shared::{CloudTrailRecord, Document, Family, FamilyRecord, RawRow};

use super::{merged_properties, mismatch, TelemetryFamily};
use crate::errors::RowError;
use crate::loader::WriteMode;
use crate::processor::columns::{decode_nested, Columns};
use crate::processor::render::TextSummary;

const SELECT: &[&str] = &[
    "class_name",
    "category_name",
    "severity",
    "type_name",
    "time",
    "to_iso8601(time_dt) AS time_dt",
    "status",
    "api.operation AS api_operation",
    "api.service.name AS api_service_name",
    "http_request.user_agent AS http_user_agent",
    "actor.user.uid AS user",
    "actor.user.type AS user_type",
    "actor.user.uid_alt AS user_uid_alt",
    "class_uid",
    "category_uid",
    "severity_id",
    "activity_name",
    "activity_id",
    "type_uid",
    "is_mfa",
    "accountid",
    "region",
    "asl_version",
    "CAST(actor AS JSON) AS actor",
    "CAST(api AS JSON) AS api",
    "CAST(src_endpoint AS JSON) AS src_endpoint",
    "CAST(dst_endpoint AS JSON) AS dst_endpoint",
    "CAST(http_request AS JSON) AS http_request",
    "CAST(session AS JSON) AS session",
    "CAST(policy AS JSON) AS policy",
    "CAST(cloud AS JSON) AS cloud",
    "CAST(observables AS JSON) AS observables",
    "CAST(unmapped AS JSON) AS unmapped",
];

/// CloudTrail management event profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloudTrail;

impl TelemetryFamily for CloudTrail {
    fn family(&self) -> Family {
        Family::CloudTrail
    }

    fn select_list(&self) -> &'static [&'static str] {
        SELECT
    }

    fn write_mode(&self) -> WriteMode {
        WriteMode::PerDocument
    }

    fn index_properties(&self) -> Value {
        merged_properties(
            "text",
            &[
                ("status", "keyword"),
                ("api_operation", "keyword"),
                ("api_service_name", "keyword"),
                ("http_user_agent", "text"),
                ("user", "keyword"),
                ("user_type", "keyword"),
                ("user_uid_alt", "keyword"),
                ("is_mfa", "boolean"),
                ("actor", "object"),
                ("api", "object"),
                ("src_endpoint", "object"),
                ("dst_endpoint", "object"),
                ("http_request", "object"),
                ("session", "object"),
                ("policy", "object"),
            ],
        )
    }

    fn map_row(&self, row: &RawRow) -> Result<Document, RowError> {
        let columns = Columns::new(row);
        let mut api = columns.json("api")?;
        decode_nested(&mut api, &["request", "data"], "api")?;

        let record = CloudTrailRecord {
            status: columns.text("status")?,
            api_operation: columns.text("api_operation")?,
            api_service_name: columns.text("api_service_name")?,
            http_user_agent: columns.text("http_user_agent")?,
            user: columns.text("user")?,
            user_type: columns.text("user_type")?,
            user_uid_alt: columns.text("user_uid_alt")?,
            is_mfa: columns.boolean("is_mfa")?,
            actor: columns.json("actor")?,
            api,
            src_endpoint: columns.json("src_endpoint")?,
            dst_endpoint: columns.json("dst_endpoint")?,
            http_request: columns.json("http_request")?,
            session: columns.json("session")?,
            policy: columns.json("policy")?,
        };
        Ok(Document::new(columns.envelope()?, record))
    }

    fn embedding_text(&self, document: &Document) -> Result<String, RowError> {
        let FamilyRecord::CloudTrail(record) = &document.record else {
            return Err(mismatch(Family::CloudTrail, document));
        };
        let envelope = &document.envelope;

        Ok(TextSummary::new()
            .field("Class Name", envelope.class_name.as_deref())
            .field("Category Name", envelope.category_name.as_deref())
            .field("Event Type", envelope.type_name.as_deref())
            .field("Severity", envelope.severity.as_deref())
            .field("Event Time", Some(&envelope.time_dt))
            .field("Status", record.status.as_deref())
            .field("API Operation", record.api_operation.as_deref())
            .field("API Service", record.api_service_name.as_deref())
            .field("User", record.user.as_deref())
            .field("User Type", record.user_type.as_deref())
            .field("MFA", record.is_mfa)
            .nested("Source IP Address", record.src_endpoint.as_ref(), "/ip")
            .field("HTTP User Agent", record.http_user_agent.as_deref())
            .nested("Cloud Provider", envelope.cloud.as_ref(), "/provider")
            .nested("Cloud Region", envelope.cloud.as_ref(), "/region")
            .finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::families::fixtures;

    const EVENT: &[(&str, &str)] = &[
        ("status", "Success"),
        ("api_operation", "GetTable"),
        ("api_service_name", "glue.amazonaws.com"),
        ("http_user_agent", "athena.amazonaws.com"),
        ("user", "AROAEXAMPLE:analyst"),
        ("user_type", "AssumedRole"),
        ("user_uid_alt", ""),
        ("is_mfa", "false"),
        ("actor", "{\"user\":{\"type\":\"AssumedRole\"}}"),
        (
            "api",
            "{\"operation\":\"GetTable\",\"request\":{\"data\":\"{\\\"databaseName\\\":\\\"lake\\\"}\"}}",
        ),
        ("src_endpoint", "{\"ip\":\"203.0.113.7\"}"),
        ("dst_endpoint", ""),
        ("http_request", "{\"user_agent\":\"athena.amazonaws.com\"}"),
        ("session", ""),
        ("policy", ""),
    ];

    #[test]
    fn test_map_row_decodes_request_data() {
        let doc = CloudTrail.map_row(&fixtures::row(EVENT)).unwrap();
        let FamilyRecord::CloudTrail(record) = &doc.record else {
            panic!("wrong family");
        };

        assert_eq!(record.api.as_ref().unwrap()["request"]["data"]["databaseName"], "lake");
        assert_eq!(record.is_mfa, Some(false));
        assert_eq!(record.user_uid_alt, None);
        assert_eq!(record.session, None);
        assert_eq!(doc.envelope.accountid.as_deref(), Some("123456789012"));
    }

    #[test]
    fn test_malformed_request_data_is_row_error() {
        let mut pairs = EVENT.to_vec();
        pairs.push(("api", "{\"request\":{\"data\":\"{not json\"}}"));
        assert!(matches!(
            CloudTrail.map_row(&fixtures::row(&pairs)),
            Err(RowError::InvalidJson { .. })
        ));
    }

    #[test]
    fn test_embedding_text() {
        let doc = CloudTrail.map_row(&fixtures::row(EVENT)).unwrap();
        let text = CloudTrail.embedding_text(&doc).unwrap();

        assert!(text.starts_with("Class Name: API Activity\n"));
        assert!(text.contains("API Operation: GetTable"));
        assert!(text.contains("Source IP Address: 203.0.113.7"));
        assert!(text.contains("Cloud Provider: AWS"));
        assert!(text.contains("MFA: false"));
    }
}
