//! Route 53 resolver query logs.
//!
//! Lookups made by the agents of the platform itself are excluded from every
//! window.

use serde_json::Value;

use lake_indexer_shared::{Document, Family, FamilyRecord, RawRow, Route53Record};

use super::{merged_properties, mismatch, TelemetryFamily};
use crate::errors::RowError;
use crate::loader::WriteMode;
use crate::processor::columns::Columns;
use crate::processor::render::TextSummary;

const SELECT: &[&str] = &[
    "class_name",
    "class_uid",
    "category_name",
    "category_uid",
    "severity",
    "severity_id",
    "activity_name",
    "activity_id",
    "type_name",
    "type_uid",
    "rcode",
    "rcode_id",
    "disposition",
    "action",
    "action_id",
    "accountid",
    "region",
    "asl_version",
    "time",
    "to_iso8601(time_dt) AS time_dt",
    "query.hostname AS query_hostname",
    "query.type AS query_type",
    "CAST(cloud AS JSON) AS cloud",
    "CAST(src_endpoint AS JSON) AS src_endpoint",
    "CAST(dst_endpoint AS JSON) AS dst_endpoint",
    "CAST(query AS JSON) AS query",
    "CAST(answers AS JSON) AS answers",
    "CAST(connection_info AS JSON) AS connection_info",
    "CAST(firewall_rule AS JSON) AS firewall_rule",
    "CAST(observables AS JSON) AS observables",
    "CAST(unmapped AS JSON) AS unmapped",
];

/// Route 53 resolver query log profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct Route53;

impl TelemetryFamily for Route53 {
    fn family(&self) -> Family {
        Family::Route53
    }

    fn select_list(&self) -> &'static [&'static str] {
        SELECT
    }

    fn window_filter(&self) -> Option<&'static str> {
        Some(
            "query.hostname NOT IN ('ec2messages.us-east-1.amazonaws.com.', 'monitoring.amazonaws.com.')",
        )
    }

    fn write_mode(&self) -> WriteMode {
        WriteMode::PerDocument
    }

    fn index_properties(&self) -> Value {
        merged_properties(
            "text",
            &[
                ("query_hostname", "keyword"),
                ("query_type", "keyword"),
                ("rcode", "keyword"),
                ("rcode_id", "integer"),
                ("disposition", "keyword"),
                ("action", "keyword"),
                ("action_id", "integer"),
                ("src_endpoint", "object"),
                ("dst_endpoint", "object"),
                ("query", "object"),
                ("answers", "object"),
                ("connection_info", "object"),
                ("firewall_rule", "object"),
            ],
        )
    }

    fn map_row(&self, row: &RawRow) -> Result<Document, RowError> {
        let columns = Columns::new(row);
        let record = Route53Record {
            query_hostname: columns.text("query_hostname")?,
            query_type: columns.text("query_type")?,
            rcode: columns.text("rcode")?,
            rcode_id: columns.integer("rcode_id")?,
            disposition: columns.text("disposition")?,
            action: columns.text("action")?,
            action_id: columns.integer("action_id")?,
            src_endpoint: columns.json("src_endpoint")?,
            dst_endpoint: columns.json("dst_endpoint")?,
            query: columns.json("query")?,
            answers: columns.json("answers")?,
            connection_info: columns.json("connection_info")?,
            firewall_rule: columns.json("firewall_rule")?,
        };
        Ok(Document::new(columns.envelope()?, record))
    }

    fn embedding_text(&self, document: &Document) -> Result<String, RowError> {
        let FamilyRecord::Route53(record) = &document.record else {
            return Err(mismatch(Family::Route53, document));
        };
        let envelope = &document.envelope;
        let cloud = envelope.cloud.as_ref();
        let source = record.src_endpoint.as_ref();
        let connection = record.connection_info.as_ref();

        Ok(TextSummary::new()
            .field("class_name", envelope.class_name.as_deref())
            .field("category_name", envelope.category_name.as_deref())
            .field("severity", envelope.severity.as_deref())
            .field("type_name", envelope.type_name.as_deref())
            .field("time_dt", Some(&envelope.time_dt))
            .field("activity_name", envelope.activity_name.as_deref())
            .field("query_hostname", record.query_hostname.as_deref())
            .field("query_type", record.query_type.as_deref())
            .nested("query_class", record.query.as_ref(), "/class")
            .field("rcode", record.rcode.as_deref())
            .field("disposition", record.disposition.as_deref())
            .field("action", record.action.as_deref())
            .field("accountid", envelope.accountid.as_deref())
            .field("region", envelope.region.as_deref())
            .nested("cloud_account_uid", cloud, "/account/uid")
            .nested("cloud_provider", cloud, "/provider")
            .nested("src_endpoint_vpc_uid", source, "/vpc_uid")
            .nested("src_endpoint_ip", source, "/ip")
            .nested("src_endpoint_port", source, "/port")
            .nested("src_endpoint_instance_uid", source, "/instance_uid")
            .nested("protocol_name", connection, "/protocol_name")
            .nested("direction", connection, "/direction")
            .finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::families::fixtures;

    const LOOKUP: &[(&str, &str)] = &[
        ("class_name", "DNS Activity"),
        ("query_hostname", "example.com."),
        ("query_type", "A"),
        ("rcode", "NoError"),
        ("rcode_id", "0"),
        ("disposition", ""),
        ("action", ""),
        ("action_id", ""),
        ("src_endpoint", "{\"vpc_uid\":\"vpc-1\",\"ip\":\"10.0.0.5\",\"port\":53011}"),
        ("dst_endpoint", ""),
        ("query", "{\"hostname\":\"example.com.\",\"type\":\"A\",\"class\":\"IN\"}"),
        ("answers", "[{\"type\":\"A\",\"rdata\":\"93.184.216.34\"}]"),
        ("connection_info", "{\"protocol_name\":\"UDP\",\"direction\":\"Outbound\"}"),
        ("firewall_rule", ""),
    ];

    #[test]
    fn test_map_row() {
        let doc = Route53.map_row(&fixtures::row(LOOKUP)).unwrap();
        let FamilyRecord::Route53(record) = &doc.record else {
            panic!("wrong family");
        };

        assert_eq!(record.rcode_id, Some(0));
        assert_eq!(record.action_id, None);
        assert_eq!(record.answers.as_ref().unwrap()[0]["rdata"], "93.184.216.34");
        assert_eq!(record.firewall_rule, None);
    }

    #[test]
    fn test_embedding_text() {
        let doc = Route53.map_row(&fixtures::row(LOOKUP)).unwrap();
        let text = Route53.embedding_text(&doc).unwrap();

        assert!(text.contains("query_hostname: example.com."));
        assert!(text.contains("query_class: IN"));
        assert!(text.contains("src_endpoint_port: 53011"));
        assert!(text.contains("src_endpoint_instance_uid: N/A"));
        assert!(text.contains("action: N/A"));
    }

    #[test]
    fn test_window_excludes_agent_lookups() {
        let query = Route53.source_query("r53", Some(5), 10);
        assert!(query.contains("WHERE time > 5 AND query.hostname NOT IN ("));
        assert!(query.contains("'monitoring.amazonaws.com.'"));
    }
}
