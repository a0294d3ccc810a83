//! Telemetry families.

use std::fmt;

/// One telemetry source type with its own schema, query and destination index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// CloudTrail management events.
    CloudTrail,
    /// Security Hub findings.
    SecurityHub,
    /// Lambda data events (function invocations).
    Lambda,
    /// Route 53 resolver query logs.
    Route53,
    /// S3 data events (object access).
    S3Data,
    /// VPC flow logs.
    VpcFlow,
}

impl Family {
    /// Every family, in the order a full run processes them.
    pub const ALL: [Family; 6] = [
        Family::CloudTrail,
        Family::SecurityHub,
        Family::Lambda,
        Family::Route53,
        Family::S3Data,
        Family::VpcFlow,
    ];

    /// Key used for this family in the datasource map.
    pub fn source_key(self) -> &'static str {
        match self {
            Family::CloudTrail => "cloudtrail_management",
            Family::SecurityHub => "security_hub",
            Family::Lambda => "lambda_data_events",
            Family::Route53 => "route53_logs",
            Family::S3Data => "s3_data_events",
            Family::VpcFlow => "vpc_flow_logs",
        }
    }

    /// Look a family up by its datasource map key.
    pub fn from_source_key(key: &str) -> Option<Family> {
        Family::ALL.into_iter().find(|f| f.source_key() == key)
    }

    /// Index name used when the datasource map does not override it.
    pub fn default_index_name(self) -> &'static str {
        match self {
            Family::CloudTrail => "security_lake_cloud_trail_index",
            Family::SecurityHub => "security_lake_findings_index",
            Family::Lambda => "security_lake_lambda_index",
            Family::Route53 => "security_lake_route53_index",
            Family::S3Data => "security_lake_s3_data_index",
            Family::VpcFlow => "security_lake_vpc_flow_index",
        }
    }

    /// Human readable name for logs.
    pub fn display_name(self) -> &'static str {
        match self {
            Family::CloudTrail => "Cloud Trail",
            Family::SecurityHub => "Findings",
            Family::Lambda => "Lambda",
            Family::Route53 => "Route53",
            Family::S3Data => "S3 Data",
            Family::VpcFlow => "VPC Flow",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_key_lookup() {
        for family in Family::ALL {
            assert_eq!(Family::from_source_key(family.source_key()), Some(family));
        }
        assert_eq!(Family::from_source_key("eks_audit"), None);
    }

    #[test]
    fn test_default_index_names_are_distinct() {
        let mut names: Vec<&str> = Family::ALL.iter().map(|f| f.default_index_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Family::ALL.len());
    }
}
