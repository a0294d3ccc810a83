//! S3 data events (object access).
//!
//! Requests issued by the query engine while it reads the lake are excluded.

use serde_json::Value;

use lake_indexer_shared::{Document, Family, FamilyRecord, RawRow, S3DataRecord};

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
    "status",
    "api.service.name AS api_service_name",
    "api.operation AS api_operation",
    "api.response.error AS response_error",
    "http_request.user_agent AS http_user_agent",
    "resources[1].uid AS resources_uid",
    "resources[1].type AS resource_type",
    "to_iso8601(time_dt) AS time_dt",
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
    "CAST(cloud AS JSON) AS cloud",
    "CAST(api AS JSON) AS api",
    "CAST(dst_endpoint AS JSON) AS dst_endpoint",
    "CAST(actor AS JSON) AS actor",
    "CAST(http_request AS JSON) AS http_request",
    "CAST(src_endpoint AS JSON) AS src_endpoint",
    "CAST(session AS JSON) AS session",
    "CAST(policy AS JSON) AS policy",
    "CAST(resources AS JSON) AS resources",
    "CAST(\"user\" AS JSON) AS \"user\"",
    "CAST(observables AS JSON) AS observables",
    "CAST(unmapped AS JSON) AS unmapped",
];

/// S3 data event profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct S3Data;

impl TelemetryFamily for S3Data {
    fn family(&self) -> Family {
        Family::S3Data
    }

    fn select_list(&self) -> &'static [&'static str] {
        SELECT
    }

    fn window_filter(&self) -> Option<&'static str> {
        Some("http_request.user_agent != 'athena.amazonaws.com'")
    }

    fn write_mode(&self) -> WriteMode {
        WriteMode::Batched
    }

    fn index_properties(&self) -> Value {
        merged_properties(
            "keyword",
            &[
                ("status", "keyword"),
                ("api_service_name", "keyword"),
                ("api_operation", "keyword"),
                ("response_error", "keyword"),
                ("http_user_agent", "text"),
                ("resources_uid", "keyword"),
                ("resource_type", "keyword"),
                ("is_mfa", "boolean"),
                ("api", "object"),
                ("dst_endpoint", "object"),
                ("actor", "object"),
                ("http_request", "object"),
                ("src_endpoint", "object"),
                ("session", "object"),
                ("policy", "object"),
                ("resources", "object"),
                ("user", "object"),
            ],
        )
    }

    fn map_row(&self, row: &RawRow) -> Result<Document, RowError> {
        let columns = Columns::new(row);
        let mut api = columns.json("api")?;
        decode_nested(&mut api, &["request", "data"], "api")?;

        let record = S3DataRecord {
            status: columns.text("status")?,
            api_service_name: columns.text("api_service_name")?,
            api_operation: columns.text("api_operation")?,
            response_error: columns.text("response_error")?,
            http_user_agent: columns.text("http_user_agent")?,
            resources_uid: columns.text("resources_uid")?,
            resource_type: columns.text("resource_type")?,
            is_mfa: columns.boolean("is_mfa")?,
            api,
            dst_endpoint: columns.json("dst_endpoint")?,
            actor: columns.json("actor")?,
            http_request: columns.json("http_request")?,
            src_endpoint: columns.json("src_endpoint")?,
            session: columns.json("session")?,
            policy: columns.json("policy")?,
            resources: columns.json("resources")?,
            user: columns.json("user")?,
        };
        Ok(Document::new(columns.envelope()?, record))
    }

    fn embedding_text(&self, document: &Document) -> Result<String, RowError> {
        let FamilyRecord::S3Data(record) = &document.record else {
            return Err(mismatch(Family::S3Data, document));
        };
        let envelope = &document.envelope;
        let api = record.api.as_ref();
        let actor = record.actor.as_ref();
        let resources = record.resources.as_ref();

        Ok(TextSummary::new()
            .field("Class Name", envelope.class_name.as_deref())
            .field("Category Name", envelope.category_name.as_deref())
            .field("Severity", envelope.severity.as_deref())
            .field("Type Name", envelope.type_name.as_deref())
            .field("Time", Some(&envelope.time_dt))
            .field("Status", record.status.as_deref())
            .field("API Service Name", record.api_service_name.as_deref())
            .field("API Operation", record.api_operation.as_deref())
            .field("Response Error", record.response_error.as_deref())
            .nested("Bucket Name", api, "/request/data/bucketName")
            .nested("Object Key", api, "/request/data/key")
            .nested("Actor User Type", actor, "/user/type")
            .nested("Actor Invoked By", actor, "/invoked_by")
            .nested("Source Endpoint Domain", record.src_endpoint.as_ref(), "/domain")
            .field("Resource UID", record.resources_uid.as_deref())
            .field("Resource Type", record.resource_type.as_deref())
            .nested("Bucket Owner Account UID", resources, "/1/owner/account/uid")
            .field("Account ID", envelope.accountid.as_deref())
            .field("Region", envelope.region.as_deref())
            .nested("Cloud Provider", envelope.cloud.as_ref(), "/provider")
            .finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::families::fixtures;

    const ACCESS: &[(&str, &str)] = &[
        ("status", "Success"),
        ("api_service_name", "s3.amazonaws.com"),
        ("api_operation", "GetObject"),
        ("response_error", ""),
        ("http_user_agent", "aws-cli/2.15"),
        ("resources_uid", "arn:aws:s3:::reports/q1.csv"),
        ("resource_type", "AWS::S3::Object"),
        ("is_mfa", ""),
        (
            "api",
            "{\"operation\":\"GetObject\",\"request\":{\"data\":\"{\\\"bucketName\\\":\\\"reports\\\",\\\"key\\\":\\\"q1.csv\\\"}\"}}",
        ),
        ("dst_endpoint", ""),
        ("actor", "{\"user\":{\"type\":\"IAMUser\"},\"invoked_by\":\"\"}"),
        ("http_request", ""),
        ("src_endpoint", "{\"domain\":\"s3.amazonaws.com\"}"),
        ("session", ""),
        ("policy", ""),
        (
            "resources",
            "[{\"uid\":\"arn:aws:s3:::reports/q1.csv\"},{\"uid\":\"arn:aws:s3:::reports\",\"owner\":{\"account\":{\"uid\":\"210987654321\"}}}]",
        ),
        ("user", ""),
    ];

    #[test]
    fn test_map_row() {
        let doc = S3Data.map_row(&fixtures::row(ACCESS)).unwrap();
        let FamilyRecord::S3Data(record) = &doc.record else {
            panic!("wrong family");
        };

        assert_eq!(record.api.as_ref().unwrap()["request"]["data"]["key"], "q1.csv");
        assert_eq!(record.is_mfa, None);
        assert_eq!(record.response_error, None);
        assert_eq!(record.resource_type.as_deref(), Some("AWS::S3::Object"));
    }

    #[test]
    fn test_embedding_text() {
        let doc = S3Data.map_row(&fixtures::row(ACCESS)).unwrap();
        let text = S3Data.embedding_text(&doc).unwrap();

        assert!(text.contains("Bucket Name: reports"));
        assert!(text.contains("Object Key: q1.csv"));
        assert!(text.contains("Actor User Type: IAMUser"));
        assert!(text.contains("Bucket Owner Account UID: 210987654321"));
        assert!(text.contains("Response Error: N/A"));
    }

    #[test]
    fn test_keyword_labels() {
        let props = S3Data.index_properties();
        assert_eq!(props["class_name"]["type"], "keyword");
        assert_eq!(props["region"]["type"], "keyword");
    }
}
