//! Plain-text summaries fed to the embedding model.

use std::fmt::Display;

use serde_json::Value;

/// Rendered for a field that has no value.
pub const NOT_AVAILABLE: &str = "N/A";

/// Builder for a `Label: value` summary, one field per line.
#[derive(Debug, Default)]
pub struct TextSummary {
    lines: Vec<String>,
}

impl TextSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scalar field.
    pub fn field<T: Display>(mut self, label: &str, value: Option<T>) -> Self {
        let rendered = match value {
            Some(value) => value.to_string(),
            None => NOT_AVAILABLE.to_string(),
        };
        self.lines.push(format!("{}: {}", label, rendered));
        self
    }

    /// Add a field looked up inside a decoded object by JSON pointer.
    pub fn nested(self, label: &str, object: Option<&Value>, pointer: &str) -> Self {
        let value = object
            .and_then(|object| object.pointer(pointer))
            .and_then(render_value);
        self.field(label, value)
    }

    /// Add a whole decoded object, serialized compactly.
    pub fn object(self, label: &str, object: Option<&Value>) -> Self {
        self.field(label, object.and_then(render_value))
    }

    pub fn finish(self) -> String {
        self.lines.join("\n")
    }
}

fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_values_render_placeholder() {
        let text = TextSummary::new()
            .field("Severity", Some("High"))
            .field::<i64>("Port", None)
            .field("Packets", Some(12))
            .finish();
        assert_eq!(text, "Severity: High\nPort: N/A\nPackets: 12");
    }

    #[test]
    fn test_nested_lookup() {
        let cloud = json!({"provider": "AWS", "account": {"uid": "123"}, "zone": null});
        let text = TextSummary::new()
            .nested("Provider", Some(&cloud), "/provider")
            .nested("Account", Some(&cloud), "/account/uid")
            .nested("Zone", Some(&cloud), "/zone")
            .nested("Missing", None, "/provider")
            .finish();
        assert_eq!(text, "Provider: AWS\nAccount: 123\nZone: N/A\nMissing: N/A");
    }

    #[test]
    fn test_object_is_compact_json() {
        let traffic = json!({"bytes": 10});
        let text = TextSummary::new().object("Traffic", Some(&traffic)).finish();
        assert_eq!(text, "Traffic: {\"bytes\":10}");
    }
}
