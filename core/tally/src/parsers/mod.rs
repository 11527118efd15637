//! Data-format parsers, attached to the inputs that read raw text (e.g. the output of a command).
//!
//! An input declares that it needs a parser by implementing [`ParserInput`](crate::plugin::ParserInput).
//! The parser is chosen by the `data_format` setting of the input and built by [`new_parser`].
use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metric::Metric;

pub use influx::InfluxParser;
pub use json::JsonParser;

mod influx;
mod json;

/// Turns raw bytes into metrics.
pub trait Parser: fmt::Debug + Send + Sync {
    /// Parses a buffer that may contain several metrics.
    fn parse(&self, buf: &[u8]) -> Result<Vec<Metric>, ParseError>;

    /// Parses a buffer that contains exactly one metric.
    fn parse_line(&self, line: &str) -> Result<Metric, ParseError>;

    /// Sets the tags that are added to every metric that does not already have them.
    fn set_default_tags(&mut self, tags: BTreeMap<String, String>);

    /// The format understood by this parser.
    fn data_format(&self) -> DataFormat;
}

/// Supported data formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    /// InfluxDB line protocol.
    #[default]
    Influx,
    /// JSON objects with numeric values.
    Json,
}

/// Settings used to build a parser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserConfig {
    /// Name of the format, see [`DataFormat`].
    pub data_format: String,
    /// Measurement name, for the formats that do not carry one (json).
    pub metric_name: String,
    /// Keys that become tags instead of fields (json).
    pub tag_keys: Vec<String>,
    pub default_tags: BTreeMap<String, String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown data format '{0}', expected one of: influx, json")]
pub struct UnknownDataFormat(pub String);

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("input is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("line {line}: {reason}")]
    Line { line: usize, reason: String },
    #[error("{0}")]
    Invalid(String),
    #[error("invalid JSON")]
    Json(#[from] serde_json::Error),
}

impl ParseError {
    fn invalid(reason: impl Into<String>) -> Self {
        ParseError::Invalid(reason.into())
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataFormat::Influx => f.write_str("influx"),
            DataFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for DataFormat {
    type Err = UnknownDataFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "influx" => Ok(DataFormat::Influx),
            "json" => Ok(DataFormat::Json),
            other => Err(UnknownDataFormat(other.to_owned())),
        }
    }
}

/// Builds a parser according to its configuration.
pub fn new_parser(config: &ParserConfig) -> Result<Box<dyn Parser>, UnknownDataFormat> {
    let format: DataFormat = config.data_format.parse()?;
    let mut parser: Box<dyn Parser> = match format {
        DataFormat::Influx => Box::new(InfluxParser::new()),
        DataFormat::Json => Box::new(JsonParser::new(&config.metric_name, config.tag_keys.clone())),
    };
    parser.set_default_tags(config.default_tags.clone());
    Ok(parser)
}

/// Adds the default tags that are missing from `metric`.
fn apply_default_tags(metric: &mut Metric, default_tags: &BTreeMap<String, String>) {
    for (k, v) in default_tags {
        metric.tags.entry(k.clone()).or_insert_with(|| v.clone());
    }
}
