//! Typed access to raw result columns.
//!
//! The query engine hands every value over as text. An empty value is SQL
//! NULL and becomes `None`; a column that is not part of the result at all is
//! a [`RowError::MissingColumn`] unless it is read with one of the lenient
//! accessors.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

use lake_indexer_shared::{Envelope, RawRow};

use crate::errors::RowError;

/// Placeholder the flow log producer writes for an unknown address.
const UNKNOWN_ADDRESS: &str = "-";

/// Column accessor over one raw row.
pub struct Columns<'a> {
    row: &'a RawRow,
}

impl<'a> Columns<'a> {
    /// Wrap a row.
    pub fn new(row: &'a RawRow) -> Self {
        Self { row }
    }

    /// Value of a required column; empty is `None`.
    fn present(&self, column: &str) -> Result<Option<&'a str>, RowError> {
        let value = self
            .row
            .get(column)
            .ok_or_else(|| RowError::MissingColumn(column.to_string()))?;
        Ok(non_empty(value))
    }

    /// Value of a column that some families do not select.
    fn lenient(&self, column: &str) -> Option<&'a str> {
        self.row.get(column).and_then(non_empty)
    }

    pub fn text(&self, column: &str) -> Result<Option<String>, RowError> {
        Ok(self.present(column)?.map(str::to_string))
    }

    pub fn optional_text(&self, column: &str) -> Option<String> {
        self.lenient(column).map(str::to_string)
    }

    pub fn integer(&self, column: &str) -> Result<Option<i64>, RowError> {
        self.present(column)?
            .map(|value| parse_integer(column, value))
            .transpose()
    }

    pub fn optional_integer(&self, column: &str) -> Result<Option<i64>, RowError> {
        self.lenient(column)
            .map(|value| parse_integer(column, value))
            .transpose()
    }

    pub fn boolean(&self, column: &str) -> Result<Option<bool>, RowError> {
        self.present(column)?
            .map(|value| match value.to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(RowError::InvalidBoolean {
                    column: column.to_string(),
                    value: value.to_string(),
                }),
            })
            .transpose()
    }

    /// Decode a column the source query serialized to JSON text.
    pub fn json(&self, column: &str) -> Result<Option<Value>, RowError> {
        self.present(column)?
            .map(|value| parse_json(column, value))
            .transpose()
            .map(Option::flatten)
    }

    pub fn optional_json(&self, column: &str) -> Result<Option<Value>, RowError> {
        self.lenient(column)
            .map(|value| parse_json(column, value))
            .transpose()
            .map(Option::flatten)
    }

    /// Read a timestamp column and render it as ISO-8601 in UTC.
    pub fn timestamp(&self, column: &str) -> Result<Option<String>, RowError> {
        self.present(column)?
            .map(|value| normalize_timestamp(column, value))
            .transpose()
    }

    /// Read an address column, mapping the unknown-address placeholder to `None`.
    pub fn address(&self, column: &str) -> Result<Option<String>, RowError> {
        Ok(self
            .present(column)?
            .filter(|value| *value != UNKNOWN_ADDRESS)
            .map(str::to_string))
    }

    /// Build the common envelope.
    ///
    /// `time` must be present. An empty `time_dt` is derived from `time`.
    pub fn envelope(&self) -> Result<Envelope, RowError> {
        let time = self
            .integer("time")?
            .ok_or_else(|| RowError::EmptyValue("time".to_string()))?;
        let time_dt = match self.timestamp("time_dt")? {
            Some(time_dt) => time_dt,
            None => Envelope::format_time(time).ok_or_else(|| RowError::InvalidTimestamp {
                column: "time".to_string(),
                value: time.to_string(),
            })?,
        };

        let mut envelope = Envelope::at(time, time_dt);
        envelope.class_name = self.text("class_name")?;
        envelope.class_uid = self.integer("class_uid")?;
        envelope.category_name = self.text("category_name")?;
        envelope.category_uid = self.integer("category_uid")?;
        envelope.severity = self.text("severity")?;
        envelope.severity_id = self.optional_integer("severity_id")?;
        envelope.type_name = self.text("type_name")?;
        envelope.type_uid = self.optional_integer("type_uid")?;
        envelope.activity_name = self.text("activity_name")?;
        envelope.activity_id = self.integer("activity_id")?;
        envelope.accountid = self.optional_text("accountid");
        envelope.region = self.optional_text("region");
        envelope.asl_version = self.text("asl_version")?;
        envelope.cloud = self.optional_json("cloud")?;
        envelope.observables = self.optional_json("observables")?;
        envelope.unmapped = self.optional_json("unmapped")?;
        Ok(envelope)
    }
}

/// Decode a JSON string stored at `path` inside an already decoded object.
///
/// A missing path or a non-string value is left alone; an empty string
/// becomes `null`.
pub fn decode_nested(target: &mut Option<Value>, path: &[&str], column: &str) -> Result<(), RowError> {
    let Some(mut node) = target.as_mut() else {
        return Ok(());
    };
    for key in path {
        match node.get_mut(*key) {
            Some(child) => node = child,
            None => return Ok(()),
        }
    }

    let decoded = match node {
        Value::String(encoded) if encoded.trim().is_empty() => Value::Null,
        Value::String(encoded) => serde_json::from_str(encoded)
            .map_err(|e| RowError::invalid_json(&format!("{}.{}", column, path.join(".")), e))?,
        _ => return Ok(()),
    };
    *node = decoded;
    Ok(())
}

fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn parse_integer(column: &str, value: &str) -> Result<i64, RowError> {
    value.trim().parse().map_err(|_| RowError::InvalidNumber {
        column: column.to_string(),
        value: value.to_string(),
    })
}

fn parse_json(column: &str, value: &str) -> Result<Option<Value>, RowError> {
    match serde_json::from_str(value) {
        Ok(Value::Null) => Ok(None),
        Ok(decoded) => Ok(Some(decoded)),
        Err(e) => Err(RowError::invalid_json(column, e)),
    }
}

/// Accepts RFC 3339 as well as the engine's `YYYY-MM-DD HH:MM:SS.fff [UTC]`.
fn normalize_timestamp(column: &str, value: &str) -> Result<String, RowError> {
    let trimmed = value.trim();
    let parsed = DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            let naive = trimmed.trim_end_matches(" UTC");
            NaiveDateTime::parse_from_str(naive, "%Y-%m-%d %H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S%.f"))
                .map(|dt| dt.and_utc())
        })
        .map_err(|_| RowError::InvalidTimestamp {
            column: column.to_string(),
            value: value.to_string(),
        })?;
    Ok(parsed.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_empty_value_is_none() {
        let row = row(&[("status", ""), ("rcode_id", "")]);
        let columns = Columns::new(&row);
        assert_eq!(columns.text("status").unwrap(), None);
        assert_eq!(columns.integer("rcode_id").unwrap(), None);
    }

    #[test]
    fn test_missing_column_is_error() {
        let row = row(&[]);
        let columns = Columns::new(&row);
        assert!(matches!(
            columns.text("status"),
            Err(RowError::MissingColumn(c)) if c == "status"
        ));
        assert_eq!(columns.optional_text("region"), None);
    }

    #[test]
    fn test_invalid_values() {
        let row = row(&[("class_uid", "abc"), ("is_mfa", "yes"), ("cloud", "{bad")]);
        let columns = Columns::new(&row);
        assert!(matches!(
            columns.integer("class_uid"),
            Err(RowError::InvalidNumber { .. })
        ));
        assert!(matches!(
            columns.boolean("is_mfa"),
            Err(RowError::InvalidBoolean { .. })
        ));
        assert!(matches!(columns.json("cloud"), Err(RowError::InvalidJson { .. })));
    }

    #[test]
    fn test_json_null_is_none() {
        let row = row(&[("policy", "null"), ("cloud", "{\"region\":\"us-east-1\"}")]);
        let columns = Columns::new(&row);
        assert_eq!(columns.json("policy").unwrap(), None);
        assert_eq!(columns.json("cloud").unwrap(), Some(json!({"region": "us-east-1"})));
    }

    #[test]
    fn test_address_placeholder() {
        let row = row(&[("src_endpoint_ip", "-"), ("dst_endpoint_ip", "10.0.0.1")]);
        let columns = Columns::new(&row);
        assert_eq!(columns.address("src_endpoint_ip").unwrap(), None);
        assert_eq!(
            columns.address("dst_endpoint_ip").unwrap().as_deref(),
            Some("10.0.0.1")
        );
    }

    #[test]
    fn test_timestamp_formats() {
        let row = row(&[
            ("a", "2024-05-01T12:00:00.000Z"),
            ("b", "2024-05-01 12:00:00.250 UTC"),
            ("c", "yesterday"),
            ("d", "2024-05-01T12:00:00.000"),
            ("e", "2024-05-01T12:00:00"),
        ]);
        let columns = Columns::new(&row);
        assert_eq!(
            columns.timestamp("a").unwrap().as_deref(),
            Some("2024-05-01T12:00:00.000Z")
        );
        assert_eq!(
            columns.timestamp("b").unwrap().as_deref(),
            Some("2024-05-01T12:00:00.250Z")
        );
        assert!(matches!(
            columns.timestamp("c"),
            Err(RowError::InvalidTimestamp { .. })
        ));
        // Unzoned values are read as UTC.
        assert_eq!(
            columns.timestamp("d").unwrap().as_deref(),
            Some("2024-05-01T12:00:00.000Z")
        );
        assert_eq!(
            columns.timestamp("e").unwrap().as_deref(),
            Some("2024-05-01T12:00:00.000Z")
        );
    }

    #[test]
    fn test_envelope_derives_time_dt() {
        let row = row(&[
            ("time", "1714564800000"),
            ("time_dt", ""),
            ("class_name", "Network Activity"),
            ("class_uid", "4001"),
            ("category_name", "Network Activity"),
            ("category_uid", "4"),
            ("severity", "Informational"),
            ("type_name", "Network Activity: Traffic"),
            ("activity_name", "Traffic"),
            ("activity_id", "6"),
            ("asl_version", "2.0"),
        ]);
        let envelope = Columns::new(&row).envelope().unwrap();
        assert_eq!(envelope.time, 1_714_564_800_000);
        assert_eq!(envelope.time_dt, "2024-05-01T12:00:00.000Z");
        assert_eq!(envelope.class_uid, Some(4001));
        assert_eq!(envelope.severity_id, None);
        assert_eq!(envelope.cloud, None);
    }

    #[test]
    fn test_envelope_requires_time() {
        let row = row(&[("time", ""), ("time_dt", "")]);
        assert!(matches!(
            Columns::new(&row).envelope(),
            Err(RowError::EmptyValue(c)) if c == "time"
        ));
    }

    #[test]
    fn test_decode_nested() {
        let mut api = Some(json!({"request": {"data": "{\"bucketName\":\"logs\"}"}}));
        decode_nested(&mut api, &["request", "data"], "api").unwrap();
        assert_eq!(api.unwrap()["request"]["data"]["bucketName"], "logs");

        let mut empty = Some(json!({"request": {"data": ""}}));
        decode_nested(&mut empty, &["request", "data"], "api").unwrap();
        assert!(empty.unwrap()["request"]["data"].is_null());

        let mut absent = Some(json!({"operation": "GetObject"}));
        decode_nested(&mut absent, &["request", "data"], "api").unwrap();
        assert_eq!(absent.unwrap(), json!({"operation": "GetObject"}));

        let mut malformed = Some(json!({"request": {"data": "{oops"}}));
        assert!(matches!(
            decode_nested(&mut malformed, &["request", "data"], "api"),
            Err(RowError::InvalidJson { column, .. }) if column == "api.request.data"
        ));
    }
}
