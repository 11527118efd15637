use std::collections::BTreeMap;

use super::{apply_default_tags, DataFormat, ParseError, Parser};
use crate::metric::{FieldValue, Metric};

/// Parser for the InfluxDB line protocol.
///
/// ```text
/// measurement[,tag_key=tag_value...] field_key=field_value[,field_key=field_value...] [timestamp]
/// ```
///
/// Spaces, commas and equal signs can be escaped with a backslash.
/// Field values are floats (`1.5`), integers (`12i`), booleans (`true`, `f`, ...)
/// or double-quoted strings.
#[derive(Debug, Default)]
pub struct InfluxParser {
    default_tags: BTreeMap<String, String>,
}

impl InfluxParser {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Parser for InfluxParser {
    fn parse(&self, buf: &[u8]) -> Result<Vec<Metric>, ParseError> {
        let text = std::str::from_utf8(buf)?;
        let mut metrics = Vec::new();
        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let metric = self.parse_line(line).map_err(|e| ParseError::Line {
                line: i + 1,
                reason: e.to_string(),
            })?;
            metrics.push(metric);
        }
        Ok(metrics)
    }

    fn parse_line(&self, line: &str) -> Result<Metric, ParseError> {
        let sections: Vec<&str> = split_unescaped(line.trim(), ' ', true)
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();
        let (key, fields, timestamp) = match sections.as_slice() {
            [key, fields] => (*key, *fields, None),
            [key, fields, ts] => (*key, *fields, Some(*ts)),
            _ => return Err(ParseError::invalid(format!("expected 2 or 3 sections, got {}", sections.len()))),
        };

        let mut key_parts = split_unescaped(key, ',', false).into_iter();
        let name = unescape(key_parts.next().unwrap_or_default());
        if name.is_empty() {
            return Err(ParseError::invalid("missing measurement name"));
        }
        let mut metric = Metric::new(name);

        for tag in key_parts {
            let (k, v) = split_key_value(tag).ok_or_else(|| ParseError::invalid(format!("invalid tag '{tag}'")))?;
            metric.tags.insert(unescape(k), unescape(v));
        }

        for field in split_unescaped(fields, ',', true) {
            let (k, v) =
                split_key_value(field).ok_or_else(|| ParseError::invalid(format!("invalid field '{field}'")))?;
            metric.fields.insert(unescape(k), parse_field_value(v)?);
        }

        if let Some(ts) = timestamp {
            let ts = ts
                .parse::<i64>()
                .map_err(|_| ParseError::invalid(format!("invalid timestamp '{ts}'")))?;
            metric.timestamp = Some(ts);
        }

        apply_default_tags(&mut metric, &self.default_tags);
        Ok(metric)
    }

    fn set_default_tags(&mut self, tags: BTreeMap<String, String>) {
        self.default_tags = tags;
    }

    fn data_format(&self) -> DataFormat {
        DataFormat::Influx
    }
}

/// Splits `input` on every `separator` that is not escaped by a backslash.
///
/// If `quotes` is true, separators between double quotes are ignored.
fn split_unescaped(input: &str, separator: char, quotes: bool) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    let mut in_quotes = false;
    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' if quotes => in_quotes = !in_quotes,
            c if c == separator && !in_quotes => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => (),
        }
    }
    parts.push(&input[start..]);
    parts
}

/// Splits `key=value` on the first unescaped `=`.
fn split_key_value(input: &str) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '=' {
            let (k, v) = (&input[..i], &input[i + 1..]);
            return (!k.is_empty() && !v.is_empty()).then_some((k, v));
        }
    }
    None
}

fn unescape(input: &str) -> String {
    let mut res = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('\\', Some(&next)) if matches!(next, ' ' | ',' | '=' | '"' | '\\') => {
                res.push(next);
                chars.next();
            }
            _ => res.push(c),
        }
    }
    res
}

fn parse_field_value(value: &str) -> Result<FieldValue, ParseError> {
    if let Some(quoted) = value.strip_prefix('"') {
        return match quoted.strip_suffix('"') {
            Some(s) => Ok(FieldValue::String(unescape(s))),
            None => Err(ParseError::invalid(format!("unterminated string {value}"))),
        };
    }
    match value {
        "t" | "T" | "true" | "True" | "TRUE" => return Ok(FieldValue::Boolean(true)),
        "f" | "F" | "false" | "False" | "FALSE" => return Ok(FieldValue::Boolean(false)),
        _ => (),
    }
    if let Some(int) = value.strip_suffix('i') {
        return int
            .parse::<i64>()
            .map(FieldValue::Integer)
            .map_err(|_| ParseError::invalid(format!("invalid integer {value}")));
    }
    value
        .parse::<f64>()
        .map(FieldValue::Float)
        .map_err(|_| ParseError::invalid(format!("invalid field value {value}")))
}

#[cfg(test)]
mod tests {
    use super::{InfluxParser, Parser};
    use crate::metric::{FieldValue, Metric};

    #[test]
    fn full_line() {
        let parser = InfluxParser::new();
        let m = parser
            .parse_line("cpu,host=server01,region=eu usage=0.5,count=3i,up=true,state=\"running ok\" 1465839830100400200")
            .unwrap();
        let expected = Metric::new("cpu")
            .with_tag("host", "server01")
            .with_tag("region", "eu")
            .with_field("usage", 0.5)
            .with_field("count", 3i64)
            .with_field("up", true)
            .with_field("state", "running ok")
            .with_timestamp(1465839830100400200);
        assert_eq!(m, expected);
    }

    #[test]
    fn escapes() {
        let parser = InfluxParser::new();
        let m = parser.parse_line(r#"disk\ io,path=/mnt\,data value=1"#).unwrap();
        assert_eq!(m.name, "disk io");
        assert_eq!(m.tags["path"], "/mnt,data");
        assert_eq!(m.fields["value"], FieldValue::Float(1.0));

        let m = parser.parse_line(r#"m msg="a \"quoted\" word""#).unwrap();
        assert_eq!(m.fields["msg"], FieldValue::String(String::from(r#"a "quoted" word"#)));
    }

    #[test]
    fn multiple_lines() {
        let parser = InfluxParser::new();
        let input = b"# comment\ncpu value=1\n\nmem used=2i\n";
        let metrics = parser.parse(input).unwrap();
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].name, "cpu");
        assert_eq!(metrics[1].fields["used"], FieldValue::Integer(2));
    }

    #[test]
    fn errors() {
        let parser = InfluxParser::new();
        assert!(parser.parse_line("cpu").is_err());
        assert!(parser.parse_line("cpu value=abc").is_err());
        assert!(parser.parse_line("cpu value=1 notatimestamp").is_err());
        assert!(parser.parse_line("cpu,badtag value=1").is_err());
        assert!(parser.parse_line(",host=a value=1").is_err());

        let err = parser.parse(b"cpu value=1\ncpu value=").unwrap_err();
        assert!(err.to_string().starts_with("line 2:"), "unexpected error: {err}");
    }
}
