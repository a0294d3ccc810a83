//! Lambda data events (function invocations).

use serde_json::Value;

use lake_indexer_shared::{Document, Family, FamilyRecord, LambdaRecord, RawRow};

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
    "api.operation AS api_operation",
    "api.service.name AS api_service_name",
    "http_request.user_agent AS http_user_agent",
    "resources[1].uid AS resource_uid",
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

/// Lambda data event profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lambda;

impl TelemetryFamily for Lambda {
    fn family(&self) -> Family {
        Family::Lambda
    }

    fn select_list(&self) -> &'static [&'static str] {
        SELECT
    }

    fn write_mode(&self) -> WriteMode {
        WriteMode::Batched
    }

    fn index_properties(&self) -> Value {
        merged_properties(
            "keyword",
            &[
                ("status", "keyword"),
                ("api_operation", "keyword"),
                ("api_service_name", "keyword"),
                ("http_user_agent", "text"),
                ("resource_uid", "keyword"),
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

        let record = LambdaRecord {
            status: columns.text("status")?,
            api_operation: columns.text("api_operation")?,
            api_service_name: columns.text("api_service_name")?,
            http_user_agent: columns.text("http_user_agent")?,
            resource_uid: columns.text("resource_uid")?,
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
        let FamilyRecord::Lambda(record) = &document.record else {
            return Err(mismatch(Family::Lambda, document));
        };
        let envelope = &document.envelope;
        let api = record.api.as_ref();
        let actor = record.actor.as_ref();

        Ok(TextSummary::new()
            .field("class_name", envelope.class_name.as_deref())
            .field("category_name", envelope.category_name.as_deref())
            .field("severity", envelope.severity.as_deref())
            .field("type_name", envelope.type_name.as_deref())
            .field("time_dt", Some(&envelope.time_dt))
            .field("status", record.status.as_deref())
            .field("api_operation", record.api_operation.as_deref())
            .field("api_service_name", record.api_service_name.as_deref())
            .nested("api_version", api, "/version")
            .nested("api_request_uid", api, "/request/uid")
            .nested("api_request_data", api, "/request/data")
            .field("resource_uid", record.resource_uid.as_deref())
            .field("resource_type", record.resource_type.as_deref())
            .field("is_mfa", record.is_mfa)
            .nested("actor_user_type", actor, "/user/type")
            .nested("actor_user_name", actor, "/user/name")
            .nested("actor_user_uid", actor, "/user/uid")
            .nested("actor_invoked_by", actor, "/invoked_by")
            .field("http_user_agent", record.http_user_agent.as_deref())
            .field("accountid", envelope.accountid.as_deref())
            .field("region", envelope.region.as_deref())
            .nested("cloud_provider", envelope.cloud.as_ref(), "/provider")
            .finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::families::fixtures;

    const INVOKE: &[(&str, &str)] = &[
        ("status", "Success"),
        ("api_operation", "Invoke"),
        ("api_service_name", "lambda.amazonaws.com"),
        ("http_user_agent", ""),
        ("resource_uid", "arn:aws:lambda:us-east-1:123456789012:function:triage"),
        ("resource_type", "AWS::Lambda::Function"),
        ("is_mfa", "true"),
        (
            "api",
            "{\"version\":\"2015-03-31\",\"request\":{\"uid\":\"r-1\",\"data\":\"{\\\"functionName\\\":\\\"triage\\\"}\"}}",
        ),
        ("dst_endpoint", ""),
        ("actor", "{\"user\":{\"type\":\"AssumedRole\",\"name\":\"scheduler\"}}"),
        ("http_request", ""),
        ("src_endpoint", ""),
        ("session", ""),
        ("policy", ""),
        ("resources", "[{\"uid\":\"arn:aws:lambda:us-east-1:123456789012:function:triage\"}]"),
        ("user", ""),
    ];

    #[test]
    fn test_map_row() {
        let doc = Lambda.map_row(&fixtures::row(INVOKE)).unwrap();
        let FamilyRecord::Lambda(record) = &doc.record else {
            panic!("wrong family");
        };

        assert_eq!(record.is_mfa, Some(true));
        assert_eq!(record.http_user_agent, None);
        assert_eq!(
            record.api.as_ref().unwrap()["request"]["data"]["functionName"],
            "triage"
        );
        assert_eq!(doc.family(), Family::Lambda);
    }

    #[test]
    fn test_embedding_text_renders_decoded_payload() {
        let doc = Lambda.map_row(&fixtures::row(INVOKE)).unwrap();
        let text = Lambda.embedding_text(&doc).unwrap();

        assert!(text.contains("api_request_data: {\"functionName\":\"triage\"}"));
        assert!(text.contains("actor_user_name: scheduler"));
        assert!(text.contains("is_mfa: true"));
        assert!(text.contains("http_user_agent: N/A"));
    }
}
