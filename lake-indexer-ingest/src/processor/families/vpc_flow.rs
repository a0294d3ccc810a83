//! VPC flow logs.
//!
//! Only remote administration traffic is indexed: flows with SSH or RDP on
//! either endpoint.

use serde_json::Value;

use lake_indexer_shared::{Document, Family, FamilyRecord, RawRow, VpcFlowRecord};

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
    "type_name",
    "type_uid",
    "action",
    "action_id",
    "time",
    "to_iso8601(time_dt) AS time_dt",
    "traffic.packets AS traffic_packets",
    "traffic.bytes AS traffic_bytes",
    "activity_name",
    "activity_id",
    "to_iso8601(start_time_dt) AS start_time_dt",
    "to_iso8601(end_time_dt) AS end_time_dt",
    "disposition",
    "src_endpoint.ip AS src_endpoint_ip",
    "src_endpoint.port AS src_endpoint_port",
    "src_endpoint.svc_name AS src_endpoint_svc_name",
    "dst_endpoint.ip AS dst_endpoint_ip",
    "dst_endpoint.port AS dst_endpoint_port",
    "dst_endpoint.svc_name AS dst_endpoint_svc_name",
    "status_code",
    "accountid",
    "region",
    "asl_version",
    "CAST(cloud AS JSON) AS cloud",
    "CAST(src_endpoint AS JSON) AS src_endpoint",
    "CAST(dst_endpoint AS JSON) AS dst_endpoint",
    "CAST(connection_info AS JSON) AS connection_info",
    "CAST(traffic AS JSON) AS traffic",
    "CAST(observables AS JSON) AS observables",
    "CAST(unmapped AS JSON) AS unmapped",
];

/// VPC flow log profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct VpcFlow;

impl TelemetryFamily for VpcFlow {
    fn family(&self) -> Family {
        Family::VpcFlow
    }

    fn select_list(&self) -> &'static [&'static str] {
        SELECT
    }

    fn window_filter(&self) -> Option<&'static str> {
        Some("(src_endpoint.port IN (22, 3389) OR dst_endpoint.port IN (22, 3389))")
    }

    fn write_mode(&self) -> WriteMode {
        WriteMode::PerDocument
    }

    fn index_properties(&self) -> Value {
        merged_properties(
            "text",
            &[
                ("action", "keyword"),
                ("action_id", "integer"),
                ("traffic_packets", "long"),
                ("traffic_bytes", "long"),
                ("start_time_dt", "date"),
                ("end_time_dt", "date"),
                ("disposition", "keyword"),
                ("src_endpoint_ip", "ip"),
                ("src_endpoint_port", "integer"),
                ("src_endpoint_svc_name", "keyword"),
                ("dst_endpoint_ip", "ip"),
                ("dst_endpoint_port", "integer"),
                ("dst_endpoint_svc_name", "keyword"),
                ("status_code", "keyword"),
                ("src_endpoint", "object"),
                ("dst_endpoint", "object"),
                ("connection_info", "object"),
                ("traffic", "object"),
            ],
        )
    }

    fn map_row(&self, row: &RawRow) -> Result<Document, RowError> {
        let columns = Columns::new(row);
        let record = VpcFlowRecord {
            action: columns.text("action")?,
            action_id: columns.integer("action_id")?,
            traffic_packets: columns.integer("traffic_packets")?,
            traffic_bytes: columns.integer("traffic_bytes")?,
            start_time_dt: columns.timestamp("start_time_dt")?,
            end_time_dt: columns.timestamp("end_time_dt")?,
            disposition: columns.text("disposition")?,
            src_endpoint_ip: columns.address("src_endpoint_ip")?,
            src_endpoint_port: columns.integer("src_endpoint_port")?,
            src_endpoint_svc_name: columns.text("src_endpoint_svc_name")?,
            dst_endpoint_ip: columns.address("dst_endpoint_ip")?,
            dst_endpoint_port: columns.integer("dst_endpoint_port")?,
            dst_endpoint_svc_name: columns.text("dst_endpoint_svc_name")?,
            status_code: columns.text("status_code")?,
            src_endpoint: columns.json("src_endpoint")?,
            dst_endpoint: columns.json("dst_endpoint")?,
            connection_info: columns.json("connection_info")?,
            traffic: columns.json("traffic")?,
        };
        Ok(Document::new(columns.envelope()?, record))
    }

    fn embedding_text(&self, document: &Document) -> Result<String, RowError> {
        let FamilyRecord::VpcFlow(record) = &document.record else {
            return Err(mismatch(Family::VpcFlow, document));
        };
        let envelope = &document.envelope;

        Ok(TextSummary::new()
            .field("Class Name", envelope.class_name.as_deref())
            .field("Category Name", envelope.category_name.as_deref())
            .field("Severity", envelope.severity.as_deref())
            .field("Type Name", envelope.type_name.as_deref())
            .field("Time", Some(&envelope.time_dt))
            .field("Activity Name", envelope.activity_name.as_deref())
            .field("Source IP", record.src_endpoint_ip.as_deref())
            .field("Source Port", record.src_endpoint_port)
            .field("Source Service", record.src_endpoint_svc_name.as_deref())
            .field("Destination IP", record.dst_endpoint_ip.as_deref())
            .field("Destination Port", record.dst_endpoint_port)
            .field("Destination Service", record.dst_endpoint_svc_name.as_deref())
            .field("Traffic Packets", record.traffic_packets)
            .field("Traffic Bytes", record.traffic_bytes)
            .field("Disposition", record.disposition.as_deref())
            .field("Action", record.action.as_deref())
            .field("Start Time", record.start_time_dt.as_deref())
            .field("End Time", record.end_time_dt.as_deref())
            .field("Status Code", record.status_code.as_deref())
            .field("Account ID", envelope.accountid.as_deref())
            .field("Region", envelope.region.as_deref())
            .object("Connection Info", record.connection_info.as_ref())
            .finish())
    }
}
