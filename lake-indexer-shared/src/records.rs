//! Family-specific document fields.
//!
//! Each record carries the columns a family selects beyond the common
//! [`Envelope`](crate::Envelope). Nested objects that the query engine hands
//! over as serialized JSON are kept as structured [`Value`]s.

use serde::Serialize;
use serde_json::Value;

use crate::family::Family;

/// CloudTrail management event fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CloudTrailRecord {
    pub status: Option<String>,
    pub api_operation: Option<String>,
    pub api_service_name: Option<String>,
    pub http_user_agent: Option<String>,
    pub user: Option<String>,
    pub user_type: Option<String>,
    pub user_uid_alt: Option<String>,
    pub is_mfa: Option<bool>,
    pub actor: Option<Value>,
    pub api: Option<Value>,
    pub src_endpoint: Option<Value>,
    pub dst_endpoint: Option<Value>,
    pub http_request: Option<Value>,
    pub session: Option<Value>,
    pub policy: Option<Value>,
}

/// Security Hub finding fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SecurityHubRecord {
    pub status: Option<String>,
    pub finding_title: Option<String>,
    pub finding_desc: Option<String>,
    pub finding_created_time: Option<String>,
    pub finding_modified_time: Option<String>,
    pub finding_type: Option<String>,
    pub finding_uid: Option<String>,
    pub remediation_desc: Option<String>,
    pub remediation_references: Option<Value>,
    pub resources_type: Option<String>,
    pub resources_uid: Option<String>,
    pub resources_region: Option<String>,
    pub resources_data: Option<Value>,
    pub confidence_score: Option<i64>,
    pub compliance: Option<Value>,
    pub vulnerabilities: Option<Value>,
}

/// Lambda data event fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LambdaRecord {
    pub status: Option<String>,
    pub api_operation: Option<String>,
    pub api_service_name: Option<String>,
    pub http_user_agent: Option<String>,
    pub resource_uid: Option<String>,
    pub resource_type: Option<String>,
    pub is_mfa: Option<bool>,
    pub api: Option<Value>,
    pub dst_endpoint: Option<Value>,
    pub actor: Option<Value>,
    pub http_request: Option<Value>,
    pub src_endpoint: Option<Value>,
    pub session: Option<Value>,
    pub policy: Option<Value>,
    pub resources: Option<Value>,
    pub user: Option<Value>,
}

/// Route 53 resolver query log fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Route53Record {
    pub query_hostname: Option<String>,
    pub query_type: Option<String>,
    pub rcode: Option<String>,
    pub rcode_id: Option<i64>,
    pub disposition: Option<String>,
    pub action: Option<String>,
    pub action_id: Option<i64>,
    pub src_endpoint: Option<Value>,
    pub dst_endpoint: Option<Value>,
    pub query: Option<Value>,
    pub answers: Option<Value>,
    pub connection_info: Option<Value>,
    pub firewall_rule: Option<Value>,
}

/// S3 data event fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct S3DataRecord {
    pub status: Option<String>,
    pub api_service_name: Option<String>,
    pub api_operation: Option<String>,
    pub response_error: Option<String>,
    pub http_user_agent: Option<String>,
    pub resources_uid: Option<String>,
    pub resource_type: Option<String>,
    pub is_mfa: Option<bool>,
    pub api: Option<Value>,
    pub dst_endpoint: Option<Value>,
    pub actor: Option<Value>,
    pub http_request: Option<Value>,
    pub src_endpoint: Option<Value>,
    pub session: Option<Value>,
    pub policy: Option<Value>,
    pub resources: Option<Value>,
    pub user: Option<Value>,
}

/// VPC flow log fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VpcFlowRecord {
    pub action: Option<String>,
    pub action_id: Option<i64>,
    pub traffic_packets: Option<i64>,
    pub traffic_bytes: Option<i64>,
    pub start_time_dt: Option<String>,
    pub end_time_dt: Option<String>,
    pub disposition: Option<String>,
    pub src_endpoint_ip: Option<String>,
    pub src_endpoint_port: Option<i64>,
    pub src_endpoint_svc_name: Option<String>,
    pub dst_endpoint_ip: Option<String>,
    pub dst_endpoint_port: Option<i64>,
    pub dst_endpoint_svc_name: Option<String>,
    pub status_code: Option<String>,
    pub src_endpoint: Option<Value>,
    pub dst_endpoint: Option<Value>,
    pub connection_info: Option<Value>,
    pub traffic: Option<Value>,
}

/// Family-specific part of a [`Document`](crate::Document).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FamilyRecord {
    CloudTrail(CloudTrailRecord),
    SecurityHub(SecurityHubRecord),
    Lambda(LambdaRecord),
    Route53(Route53Record),
    S3Data(S3DataRecord),
    VpcFlow(VpcFlowRecord),
}

impl FamilyRecord {
    /// Family the record belongs to.
    pub fn family(&self) -> Family {
        match self {
            FamilyRecord::CloudTrail(_) => Family::CloudTrail,
            FamilyRecord::SecurityHub(_) => Family::SecurityHub,
            FamilyRecord::Lambda(_) => Family::Lambda,
            FamilyRecord::Route53(_) => Family::Route53,
            FamilyRecord::S3Data(_) => Family::S3Data,
            FamilyRecord::VpcFlow(_) => Family::VpcFlow,
        }
    }
}

macro_rules! impl_from_record {
    ($($variant:ident => $record:ty),* $(,)?) => {
        $(
            impl From<$record> for FamilyRecord {
                fn from(record: $record) -> Self {
                    FamilyRecord::$variant(record)
                }
            }
        )*
    };
}

impl_from_record! {
    CloudTrail => CloudTrailRecord,
    SecurityHub => SecurityHubRecord,
    Lambda => LambdaRecord,
    Route53 => Route53Record,
    S3Data => S3DataRecord,
    VpcFlow => VpcFlowRecord,
}
