use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::{apply_default_tags, DataFormat, ParseError, Parser};
use crate::metric::{FieldValue, Metric};

/// Parser for JSON documents.
///
/// The input must be an object, or an array of objects. Each object becomes one metric
/// named after the input. Nested objects are flattened: `{"a": {"b": 1}}` gives the field `a_b`.
/// Only numbers are kept as fields, except for the keys listed in `tag_keys`, which become tags.
#[derive(Debug)]
pub struct JsonParser {
    metric_name: String,
    tag_keys: Vec<String>,
    default_tags: BTreeMap<String, String>,
}

impl JsonParser {
    pub fn new(metric_name: &str, tag_keys: Vec<String>) -> Self {
        Self {
            metric_name: metric_name.to_owned(),
            tag_keys,
            default_tags: BTreeMap::new(),
        }
    }

    fn parse_object(&self, object: &Map<String, Value>) -> Metric {
        let mut metric = Metric::new(self.metric_name.clone());
        for key in &self.tag_keys {
            match object.get(key) {
                Some(Value::String(s)) => {
                    metric.tags.insert(key.clone(), s.clone());
                }
                Some(v @ (Value::Number(_) | Value::Bool(_))) => {
                    metric.tags.insert(key.clone(), v.to_string());
                }
                _ => (),
            }
        }
        flatten("", object, &self.tag_keys, &mut metric.fields);
        apply_default_tags(&mut metric, &self.default_tags);
        metric
    }
}

/// Collects the numeric values of `object` as fields, skipping the keys in `skip`.
fn flatten(prefix: &str, object: &Map<String, Value>, skip: &[String], fields: &mut BTreeMap<String, FieldValue>) {
    for (key, value) in object {
        if skip.contains(key) {
            continue;
        }
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}_{key}")
        };
        match value {
            Value::Number(n) => {
                if let Some(f) = n.as_f64() {
                    fields.insert(name, FieldValue::Float(f));
                }
            }
            Value::Object(inner) => flatten(&name, inner, &[], fields),
            _ => (),
        }
    }
}

impl Parser for JsonParser {
    fn parse(&self, buf: &[u8]) -> Result<Vec<Metric>, ParseError> {
        let value: Value = serde_json::from_slice(buf)?;
        match value {
            Value::Object(object) => Ok(vec![self.parse_object(&object)]),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Object(object) => Ok(self.parse_object(object)),
                    _ => Err(ParseError::invalid("expected an array of JSON objects")),
                })
                .collect(),
            _ => Err(ParseError::invalid("expected a JSON object or an array of objects")),
        }
    }

    fn parse_line(&self, line: &str) -> Result<Metric, ParseError> {
        let mut metrics = self.parse(line.as_bytes())?;
        match metrics.len() {
            1 => Ok(metrics.remove(0)),
            n => Err(ParseError::invalid(format!("expected one metric, got {n}"))),
        }
    }

    fn set_default_tags(&mut self, tags: BTreeMap<String, String>) {
        self.default_tags = tags;
    }

    fn data_format(&self) -> DataFormat {
        DataFormat::Json
    }
}

#[cfg(test)]
mod tests {
    use super::{JsonParser, Parser};
    use crate::metric::{FieldValue, Metric};

    #[test]
    fn nested_object() {
        let parser = JsonParser::new("exec", vec![String::from("host")]);
        let m = parser
            .parse_line(r#"{"host": "a", "load": 1.5, "mem": {"used": 10, "free": 20}, "ok": true, "msg": "x"}"#)
            .unwrap();
        let expected = Metric::new("exec")
            .with_tag("host", "a")
            .with_field("load", 1.5)
            .with_field("mem_used", 10.0)
            .with_field("mem_free", 20.0);
        assert_eq!(m, expected);
    }

    #[test]
    fn numeric_tag_key_is_not_a_field() {
        let parser = JsonParser::new("exec", vec![String::from("id")]);
        let m = parser.parse_line(r#"{"id": 7, "value": 1}"#).unwrap();
        assert_eq!(m, Metric::new("exec").with_tag("id", "7").with_field("value", 1.0));
        assert!(!m.fields.contains_key("id"));

        // only top-level keys are tags
        let m = parser.parse_line(r#"{"inner": {"id": 3}}"#).unwrap();
        assert!(m.tags.is_empty());
        assert_eq!(m.fields["inner_id"], FieldValue::Float(3.0));
    }

    #[test]
    fn array_of_objects() {
        let parser = JsonParser::new("exec", Vec::new());
        let metrics = parser.parse(br#"[{"a": 1}, {"b": 2}]"#).unwrap();
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[1].fields["b"], FieldValue::Float(2.0));
        assert!(parser.parse_line(r#"[{"a": 1}, {"b": 2}]"#).is_err());
    }

    #[test]
    fn invalid_documents() {
        let parser = JsonParser::new("exec", Vec::new());
        assert!(parser.parse(b"12").is_err());
        assert!(parser.parse(b"[1, 2]").is_err());
        assert!(parser.parse(b"{not json").is_err());
    }
}
