//! Settings read from the environment.
//!
//! The environment is read once at start. Components receive their own
//! config structs built from these settings.

use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use tracing::warn;

use lake_indexer_ingest::consumer::ExtractionConfig;
use lake_indexer_ingest::loader::LoaderConfig;
use lake_indexer_ingest::processor::DEFAULT_EMBEDDING_MODEL;
use lake_indexer_ingest::retention::PurgeConfig;
use lake_indexer_ingest::watermark::WatermarkConfig;
use lake_indexer_ingest::FamilyTarget;
use lake_indexer_shared::Family;

use crate::IndexingError;

/// Default per-run record cap.
const DEFAULT_RECORD_LIMIT: usize = 1000;

/// Default retention boundary.
const DEFAULT_PURGE_BOUNDARY: &str = "now-5d/d";

/// Default zone of the watermark midnight floor.
const DEFAULT_TIME_ZONE: &str = "US/Eastern";

/// Default documents per bulk create request.
const DEFAULT_BULK_CREATE_SIZE: usize = 1000;

/// Default ids per purge page.
const DEFAULT_BULK_DELETE_SIZE: usize = 2000;

/// Default pause between purge pages, in seconds.
const DEFAULT_PURGE_COOLDOWN_SECS: u64 = 30;

/// Default prefix of query result objects.
const DEFAULT_RESULT_PREFIX: &str = "temp-athena-output";

/// Default number of status polls per extraction.
const DEFAULT_QUERY_TIMEOUT: u32 = 30;

/// Default SigV4 service of the search backend.
const DEFAULT_SEARCH_SERVICE: &str = "aoss";

/// Session name used when assuming the query role.
pub const QUERY_ROLE_SESSION: &str = "lake-indexer";

/// How requests to the search backend are authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchAuthMode {
    SigV4,
    None,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    /// `json` selects JSON lines; anything else the human readable format.
    pub fn from_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }

    /// Read `LOG_FORMAT` from the environment.
    pub fn from_env() -> Self {
        Self::from_value(env::var("LOG_FORMAT").ok().as_deref())
    }
}

/// Everything the indexer reads from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub region: String,
    pub search_endpoint: String,
    pub search_auth: SearchAuthMode,
    pub search_service_name: String,
    pub record_limit: usize,
    pub purge_boundary: String,
    pub time_zone: Tz,
    pub bulk_create_size: usize,
    pub bulk_delete_size: usize,
    pub purge_cooldown: Duration,
    pub result_bucket: String,
    pub result_prefix: String,
    pub query_timeout: u32,
    /// Role assumed for the query engine; `None` uses the ambient identity.
    pub query_role_arn: Option<String>,
    pub database: String,
    /// Source table per family; families without one are disabled.
    pub tables: HashMap<Family, String>,
    /// Index per family; `None` disables the family.
    pub indices: HashMap<Family, Option<String>>,
    /// Single-family selector.
    pub run_index: Option<String>,
    pub embedding_model: String,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, IndexingError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IndexingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| IndexingError::config(format!("{} is required", key)))
        };

        let search_auth = match get("AOSS_AUTH").as_deref() {
            None | Some("sigv4") => SearchAuthMode::SigV4,
            Some("none") => SearchAuthMode::None,
            Some(other) => {
                return Err(IndexingError::config(format!(
                    "AOSS_AUTH must be sigv4 or none, got {}",
                    other
                )))
            }
        };

        let zone = get("AOSS_TIME_ZONE").unwrap_or_else(|| DEFAULT_TIME_ZONE.to_string());
        let time_zone = zone
            .parse::<Tz>()
            .map_err(|_| IndexingError::config(format!("unknown time zone {}", zone)))?;

        let tables = Family::ALL
            .into_iter()
            .filter_map(|family| get(table_variable(family)).map(|table| (family, table)))
            .collect();

        Ok(Self {
            region: required("AWS_REGION")?,
            search_endpoint: required("AOSS_ENDPOINT")?,
            search_auth,
            search_service_name: get("AOSS_SERVICE_NAME")
                .unwrap_or_else(|| DEFAULT_SEARCH_SERVICE.to_string()),
            record_limit: parse_or(&get, "INDEX_RECORD_LIMIT", DEFAULT_RECORD_LIMIT)?,
            purge_boundary: get("AOSS_PURGE_LT")
                .unwrap_or_else(|| DEFAULT_PURGE_BOUNDARY.to_string()),
            time_zone,
            bulk_create_size: parse_or(&get, "AOSS_BULK_CREATE_SIZE", DEFAULT_BULK_CREATE_SIZE)?,
            bulk_delete_size: parse_or(&get, "AOSS_BULK_DELETE_SIZE", DEFAULT_BULK_DELETE_SIZE)?,
            purge_cooldown: Duration::from_secs(parse_or(
                &get,
                "AOSS_PURGE_COOLDOWN_SECS",
                DEFAULT_PURGE_COOLDOWN_SECS,
            )?),
            result_bucket: required("SECURITY_LAKE_ATHENA_BUCKET")?,
            result_prefix: get("SECURITY_LAKE_ATHENA_PREFIX")
                .map(|prefix| prefix.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_RESULT_PREFIX.to_string()),
            query_timeout: parse_or(&get, "ATHENA_QUERY_TIMEOUT", DEFAULT_QUERY_TIMEOUT)?,
            query_role_arn: get("ATHENA_ROLE_ARN"),
            database: required("SL_DATABASE_NAME")?,
            tables,
            indices: datasource_map(get("SL_DATASOURCE_MAP").as_deref())?,
            run_index: get("RUN_INDEX_NAME"),
            embedding_model: get("BEDROCK_EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
        })
    }

    /// Enabled families in run order: those with both a table and an index.
    pub fn targets(&self) -> Vec<FamilyTarget> {
        Family::ALL
            .into_iter()
            .filter_map(|family| {
                let table = self.tables.get(&family)?;
                let index = self.indices.get(&family)?.as_ref()?;
                Some(FamilyTarget::new(family, index.as_str(), table.as_str()))
            })
            .collect()
    }

    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            batch_size: self.bulk_create_size,
            record_cap: self.record_limit,
        }
    }

    pub fn purge_config(&self) -> PurgeConfig {
        PurgeConfig {
            boundary: self.purge_boundary.clone(),
            batch_size: self.bulk_delete_size,
            cooldown: self.purge_cooldown,
            ..PurgeConfig::default()
        }
    }

    pub fn extraction_config(&self) -> ExtractionConfig {
        ExtractionConfig {
            database: self.database.clone(),
            bucket: self.result_bucket.clone(),
            prefix: self.result_prefix.clone(),
            max_poll_attempts: self.query_timeout,
            ..ExtractionConfig::default()
        }
    }

    pub fn watermark_config(&self) -> WatermarkConfig {
        WatermarkConfig {
            time_zone: self.time_zone,
            ..WatermarkConfig::default()
        }
    }

    /// Largest request the search client must accept.
    pub fn max_batch_size(&self) -> usize {
        self.bulk_create_size.max(self.bulk_delete_size)
    }
}

/// Variable naming the source table of `family`.
fn table_variable(family: Family) -> &'static str {
    match family {
        Family::CloudTrail => "SL_CLOUDTRAIL",
        Family::SecurityHub => "SL_FINDINGS",
        Family::Lambda => "SL_LAMBDA",
        Family::Route53 => "SL_ROUTE53",
        Family::S3Data => "SL_S3DATA",
        Family::VpcFlow => "SL_VPCFLOW",
    }
}

/// Index per family, starting from the default names and overridden by the
/// JSON map of datasource key to index name (`null` disables a family).
fn datasource_map(raw: Option<&str>) -> Result<HashMap<Family, Option<String>>, IndexingError> {
    let mut indices: HashMap<Family, Option<String>> = Family::ALL
        .into_iter()
        .map(|family| (family, Some(family.default_index_name().to_string())))
        .collect();

    let Some(raw) = raw else {
        return Ok(indices);
    };
    let overrides: HashMap<String, Option<String>> = serde_json::from_str(raw)
        .map_err(|e| IndexingError::config(format!("SL_DATASOURCE_MAP is not valid JSON: {}", e)))?;

    for (key, index) in overrides {
        match Family::from_source_key(&key) {
            Some(family) => {
                indices.insert(family, index);
            }
            None => warn!(key = %key, "Ignoring unknown datasource in SL_DATASOURCE_MAP"),
        }
    }
    Ok(indices)
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, IndexingError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| IndexingError::config(format!("{} is not a valid number: {}", key, value))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("AWS_REGION", "us-east-1"),
        ("AOSS_ENDPOINT", "https://abc.us-east-1.aoss.amazonaws.com"),
        ("SECURITY_LAKE_ATHENA_BUCKET", "lake-results"),
        ("SL_DATABASE_NAME", "amazon_security_lake_glue_db_us_east_1"),
        ("SL_LAMBDA", "lambda_table"),
        ("SL_VPCFLOW", "vpc_table"),
    ];

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(REQUIRED)).unwrap();

        assert_eq!(settings.search_auth, SearchAuthMode::SigV4);
        assert_eq!(settings.search_service_name, "aoss");
        assert_eq!(settings.record_limit, 1000);
        assert_eq!(settings.purge_boundary, "now-5d/d");
        assert_eq!(settings.time_zone, chrono_tz::US::Eastern);
        assert_eq!(settings.purge_cooldown, Duration::from_secs(30));
        assert_eq!(settings.result_prefix, "temp-athena-output");
        assert_eq!(settings.query_timeout, 30);
        assert_eq!(settings.query_role_arn, None);
        assert_eq!(settings.embedding_model, DEFAULT_EMBEDDING_MODEL);
        assert_eq!(settings.max_batch_size(), 2000);
        assert_eq!(settings.loader_config().progress_interval(), 100);
        assert_eq!(settings.extraction_config().output_location(), "s3://lake-results/temp-athena-output");
    }

    #[test]
    fn test_targets_need_table_and_index() {
        let settings = Settings::from_lookup(lookup(REQUIRED)).unwrap();
        let targets = settings.targets();

        assert_eq!(
            targets,
            vec![
                FamilyTarget::new(Family::Lambda, "security_lake_lambda_index", "lambda_table"),
                FamilyTarget::new(Family::VpcFlow, "security_lake_vpc_flow_index", "vpc_table"),
            ]
        );
    }

    #[test]
    fn test_datasource_map_overrides_and_disables() {
        let indices = datasource_map(Some(
            r#"{"lambda_data_events": "security_lambda_v2", "vpc_flow_logs": null, "waf": "x"}"#,
        ))
        .unwrap();

        assert_eq!(indices[&Family::Lambda].as_deref(), Some("security_lambda_v2"));
        assert_eq!(indices[&Family::VpcFlow], None);
        assert_eq!(
            indices[&Family::Route53].as_deref(),
            Some("security_lake_route53_index")
        );

        assert!(datasource_map(Some("not json")).is_err());
    }

    #[test]
    fn test_missing_required_variable() {
        let err = Settings::from_lookup(lookup(&[("AWS_REGION", "us-east-1")])).unwrap_err();
        assert!(err.to_string().contains("AOSS_ENDPOINT"));
    }

    #[test]
    fn test_invalid_values() {
        const BAD_LIMIT: &[(&str, &str)] = &[
            ("AWS_REGION", "us-east-1"),
            ("AOSS_ENDPOINT", "http://localhost:9200"),
            ("SECURITY_LAKE_ATHENA_BUCKET", "b"),
            ("SL_DATABASE_NAME", "db"),
            ("INDEX_RECORD_LIMIT", "many"),
        ];
        assert!(Settings::from_lookup(lookup(BAD_LIMIT)).is_err());

        const BAD_ZONE: &[(&str, &str)] = &[
            ("AWS_REGION", "us-east-1"),
            ("AOSS_ENDPOINT", "http://localhost:9200"),
            ("SECURITY_LAKE_ATHENA_BUCKET", "b"),
            ("SL_DATABASE_NAME", "db"),
            ("AOSS_TIME_ZONE", "Mars/Olympus"),
        ];
        assert!(Settings::from_lookup(lookup(BAD_ZONE)).is_err());
    }

    #[test]
    fn test_overrides() {
        const CUSTOM: &[(&str, &str)] = &[
            ("AWS_REGION", "eu-west-1"),
            ("AOSS_ENDPOINT", "http://localhost:9200"),
            ("AOSS_AUTH", "none"),
            ("SECURITY_LAKE_ATHENA_BUCKET", "b"),
            ("SL_DATABASE_NAME", "db"),
            ("INDEX_RECORD_LIMIT", "50000"),
            ("AOSS_BULK_DELETE_SIZE", "500"),
            ("AOSS_BULK_CREATE_SIZE", "5000"),
            ("AOSS_TIME_ZONE", "Europe/Dublin"),
            ("ATHENA_ROLE_ARN", "arn:aws:iam::210987654321:role/lake-query"),
            ("RUN_INDEX_NAME", "security_lake_lambda_index"),
            ("LOG_FORMAT", "json"),
        ];
        let settings = Settings::from_lookup(lookup(CUSTOM)).unwrap();

        assert_eq!(settings.search_auth, SearchAuthMode::None);
        assert_eq!(settings.time_zone, chrono_tz::Europe::Dublin);
        assert_eq!(settings.max_batch_size(), 5000);
        assert_eq!(settings.purge_config().batch_size, 500);
        assert_eq!(settings.loader_config().progress_interval(), 5000);
        assert_eq!(settings.run_index.as_deref(), Some("security_lake_lambda_index"));
        assert!(settings.query_role_arn.is_some());
        assert!(settings.targets().is_empty());
    }

    #[test]
    fn test_result_prefix_trailing_slash() {
        const SLASHED: &[(&str, &str)] = &[
            ("AWS_REGION", "us-east-1"),
            ("AOSS_ENDPOINT", "http://localhost:9200"),
            ("SECURITY_LAKE_ATHENA_BUCKET", "b"),
            ("SL_DATABASE_NAME", "db"),
            ("SECURITY_LAKE_ATHENA_PREFIX", "athena-out/"),
        ];
        let settings = Settings::from_lookup(lookup(SLASHED)).unwrap();
        let extraction = settings.extraction_config();

        assert_eq!(settings.result_prefix, "athena-out");
        assert_eq!(extraction.output_location(), "s3://b/athena-out");
        assert_eq!(extraction.result_key("job.csv"), "athena-out/job.csv");
    }

    #[test]
    fn test_log_format() {
        assert_eq!(LogFormat::from_value(Some("JSON")), LogFormat::Json);
        assert_eq!(LogFormat::from_value(Some("pretty")), LogFormat::Pretty);
        assert_eq!(LogFormat::from_value(None), LogFormat::Pretty);
    }
}
