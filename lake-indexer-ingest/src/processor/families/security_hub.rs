//! Security Hub findings.
//!
//! Findings carry no account or region columns of their own; the resource
//! region and the cloud object stand in for them.

use serde_json::Value;

use lake_indexer_shared::{Document, Family, FamilyRecord, RawRow, SecurityHubRecord};

use super::{merged_properties, mismatch, TelemetryFamily};
use crate::errors::RowError;
use crate::loader::WriteMode;
use crate::processor::columns::Columns;
use crate::processor::render::TextSummary;

const SELECT: &[&str] = &[
    "activity_id",
    "activity_name",
    "class_name",
    "class_uid",
    "category_uid",
    "category_name",
    "severity",
    "type_name",
    "time",
    "to_iso8601(time_dt) AS time_dt",
    "status",
    "finding_info.title AS finding_title",
    "finding_info.desc AS finding_desc",
    "to_iso8601(finding_info.created_time_dt) AS finding_created_time",
    "to_iso8601(finding_info.modified_time_dt) AS finding_modified_time",
    "finding_info.types[1] AS finding_type",
    "finding_info.uid AS finding_uid",
    "remediation.desc AS remediation_desc",
    "CAST(remediation.references AS JSON) AS remediation_references",
    "resources[1].type AS resources_type",
    "resources[1].uid AS resources_uid",
    "resources[1].region AS resources_region",
    "resources[1].data AS resources_data",
    "asl_version",
    "CAST(cloud AS JSON) AS cloud",
    "confidence_score",
    "CAST(compliance AS JSON) AS compliance",
    "CAST(observables AS JSON) AS observables",
    "CAST(vulnerabilities AS JSON) AS vulnerabilities",
    "CAST(unmapped AS JSON) AS unmapped",
];

/// Security Hub finding profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityHub;

impl TelemetryFamily for SecurityHub {
    fn family(&self) -> Family {
        Family::SecurityHub
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
                ("finding_title", "text"),
                ("finding_desc", "text"),
                ("finding_created_time", "date"),
                ("finding_modified_time", "date"),
                ("finding_type", "keyword"),
                ("finding_uid", "keyword"),
                ("remediation_desc", "text"),
                ("remediation_references", "keyword"),
                ("resources_type", "keyword"),
                ("resources_uid", "keyword"),
                ("resources_region", "keyword"),
                ("resources_data", "object"),
                ("confidence_score", "integer"),
                ("compliance", "object"),
                ("vulnerabilities", "object"),
            ],
        )
    }

    fn map_row(&self, row: &RawRow) -> Result<Document, RowError> {
        let columns = Columns::new(row);
        let record = SecurityHubRecord {
            status: columns.text("status")?,
            finding_title: columns.text("finding_title")?,
            finding_desc: columns.text("finding_desc")?,
            finding_created_time: columns.timestamp("finding_created_time")?,
            finding_modified_time: columns.timestamp("finding_modified_time")?,
            finding_type: columns.text("finding_type")?,
            finding_uid: columns.text("finding_uid")?,
            remediation_desc: columns.text("remediation_desc")?,
            remediation_references: columns.json("remediation_references")?,
            resources_type: columns.text("resources_type")?,
            resources_uid: columns.text("resources_uid")?,
            resources_region: columns.text("resources_region")?,
            resources_data: columns.json("resources_data")?,
            confidence_score: columns.integer("confidence_score")?,
            compliance: columns.json("compliance")?,
            vulnerabilities: columns.json("vulnerabilities")?,
        };
        Ok(Document::new(columns.envelope()?, record))
    }

    fn embedding_text(&self, document: &Document) -> Result<String, RowError> {
        let FamilyRecord::SecurityHub(record) = &document.record else {
            return Err(mismatch(Family::SecurityHub, document));
        };
        let envelope = &document.envelope;
        let cloud = envelope.cloud.as_ref();

        Ok(TextSummary::new()
            .field("Class Name", envelope.class_name.as_deref())
            .field("Category Name", envelope.category_name.as_deref())
            .field("Severity", envelope.severity.as_deref())
            .field("Type Name", envelope.type_name.as_deref())
            .field("Time", Some(&envelope.time_dt))
            .field("Finding Title", record.finding_title.as_deref())
            .field("Finding Description", record.finding_desc.as_deref())
            .field("Finding Created Time", record.finding_created_time.as_deref())
            .field("Finding Modified Time", record.finding_modified_time.as_deref())
            .field("Finding Type", record.finding_type.as_deref())
            .field("Finding UID", record.finding_uid.as_deref())
            .field("Remediation Description", record.remediation_desc.as_deref())
            .field("Resources Type", record.resources_type.as_deref())
            .field("Resources UID", record.resources_uid.as_deref())
            .field("Resources Region", record.resources_region.as_deref())
            .field("Activity Name", envelope.activity_name.as_deref())
            .field("Status", record.status.as_deref())
            .field("Confidence Score", record.confidence_score)
            .nested("AWS Account UID", cloud, "/account/uid")
            .nested("Cloud Provider", cloud, "/provider")
            .finish())
    }
}
