//! Parsing of one configuration source into blocks.
//!
//! A source is a TOML document:
//!
//! ```toml
//! [agent]
//! interval = "10s"
//!
//! [tags]
//! dc = "eu-west-1"
//!
//! [[inputs.memcached]]
//! servers = ["localhost"]
//! interval = "5s"
//! pass = ["some", "strings"]
//!   [inputs.memcached.tagpass]
//!   goodtag = ["mytag"]
//! ```
//!
//! Each table under `inputs` gives one [`ConfigBlock`]. The settings that are common to
//! every input (filter, interval, tags, naming) are extracted from the table, the other
//! settings are left untouched for the plugin. The blocks are returned in the order of
//! their headings in the text, even when the headings of different plugins interleave.
use std::{collections::BTreeMap, fmt, str::FromStr, time::Duration};

use serde::{
    de::{IgnoredAny, MapAccess, SeqAccess, Visitor},
    Deserialize, Deserializer,
};
use toml::Spanned;

use super::{
    agent::AgentConfig,
    error::{BadTypeError, DocumentError},
    substitute::substitute_env,
};
use crate::filter::FilterSpec;

pub const KEY_PASS: &str = "pass";
pub const KEY_DROP: &str = "drop";
pub const KEY_TAGPASS: &str = "tagpass";
pub const KEY_TAGDROP: &str = "tagdrop";
pub const KEY_INTERVAL: &str = "interval";
pub const KEY_TAGS: &str = "tags";
pub const KEY_NAME_PREFIX: &str = "name_prefix";
pub const KEY_NAME_SUFFIX: &str = "name_suffix";
pub const KEY_NAME_OVERRIDE: &str = "name_override";

/// Keys of an input table that are interpreted by the loader, not by the plugin.
pub const RESERVED_KEYS: [&str; 9] = [
    KEY_PASS,
    KEY_DROP,
    KEY_TAGPASS,
    KEY_TAGDROP,
    KEY_INTERVAL,
    KEY_TAGS,
    KEY_NAME_PREFIX,
    KEY_NAME_SUFFIX,
    KEY_NAME_OVERRIDE,
];

/// The parsed content of a configuration source.
#[derive(Debug, Default)]
pub struct Document {
    /// Content of the `[agent]` section, if any.
    ///
    /// The section is checked against [`AgentConfig`] but kept as a table, so that
    /// it only overrides the keys it sets.
    pub agent: Option<toml::Table>,
    /// Content of the `[tags]` section, if any.
    pub tags: Option<BTreeMap<String, String>>,
    /// One block per input table, in order.
    pub inputs: Vec<ConfigBlock>,
    /// Names of the outputs, which are not configured by this crate.
    pub outputs: Vec<String>,
}

/// One input declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigBlock {
    /// The plugin type, e.g. `memcached` for `[[inputs.memcached]]`.
    pub type_name: String,
    /// Plugin-specific settings, not interpreted here.
    pub fields: toml::Table,
    pub filter: FilterSpec,
    pub interval: Option<Duration>,
    pub tags: BTreeMap<String, String>,
    pub name_prefix: Option<String>,
    pub name_suffix: Option<String>,
    pub name_override: Option<String>,
}

/// Parses the content of a configuration source.
pub fn parse(content: &str) -> Result<Document, DocumentError> {
    let content = substitute_env(content)?;
    let table = toml::Table::from_str(&content)?;

    let mut doc = Document::default();
    for (section, value) in table {
        match section.as_str() {
            "agent" => {
                let agent = expect_table(value, "agent")?;
                AgentConfig::default().merged(agent.clone()).map_err(DocumentError::Agent)?;
                doc.agent = Some(agent);
            }
            "tags" => {
                doc.tags = Some(string_table(value, "tags")?);
            }
            "outputs" => {
                let outputs = expect_table(value, "outputs")?;
                for name in outputs.keys() {
                    log::debug!("skipping output '{name}': outputs are configured elsewhere");
                }
                doc.outputs.extend(outputs.into_iter().map(|(k, _)| k));
            }
            "inputs" => {
                let inputs = expect_table(value, "inputs")?;
                for (type_name, decl) in inputs {
                    parse_input_decl(type_name, decl, &mut doc.inputs)?;
                }
            }
            _ => return Err(DocumentError::UnsupportedSection(section)),
        }
    }
    if !doc.inputs.is_empty() {
        let positions: InputPositions = toml::from_str(&content)?;
        doc.inputs = positions.text_order(doc.inputs);
    }
    Ok(doc)
}

/// Where the input tables start in the source.
///
/// A [`toml::Table`] groups the tables of a plugin type under one key, which loses the
/// relative order of interleaved headings like `[[inputs.a]]`, `[[inputs.b]]`, `[[inputs.a]]`.
#[derive(Deserialize)]
struct InputPositions {
    #[serde(default)]
    inputs: BTreeMap<String, Spanned<Declaration>>,
}

/// `[inputs.name]`, or `[[inputs.name]]` with the start of each table of the array.
enum Declaration {
    Table,
    Array(Vec<usize>),
}

impl InputPositions {
    /// Start of the `index`-th table of `type_name`.
    fn start(&self, type_name: &str, index: usize) -> usize {
        match self.inputs.get(type_name) {
            Some(decl) => match decl.get_ref() {
                Declaration::Table => decl.span().start,
                Declaration::Array(starts) => starts.get(index).copied().unwrap_or(usize::MAX),
            },
            None => usize::MAX,
        }
    }

    /// Sorts blocks listed by plugin type, then by occurrence, into text order.
    fn text_order(&self, blocks: Vec<ConfigBlock>) -> Vec<ConfigBlock> {
        let mut seen: BTreeMap<String, usize> = BTreeMap::new();
        let mut positioned: Vec<(usize, ConfigBlock)> = blocks
            .into_iter()
            .map(|block| {
                let index = seen.entry(block.type_name.clone()).or_default();
                let start = self.start(&block.type_name, *index);
                *index += 1;
                (start, block)
            })
            .collect();
        positioned.sort_by_key(|(start, _)| *start);
        positioned.into_iter().map(|(_, block)| block).collect()
    }
}

impl<'de> Deserialize<'de> for Declaration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DeclarationVisitor;

        impl<'de> Visitor<'de> for DeclarationVisitor {
            type Value = Declaration;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a table or an array of tables")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Declaration, A::Error> {
                while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
                Ok(Declaration::Table)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Declaration, A::Error> {
                let mut starts = Vec::new();
                while let Some(table) = seq.next_element::<Spanned<IgnoredAny>>()? {
                    starts.push(table.span().start);
                }
                Ok(Declaration::Array(starts))
            }
        }

        deserializer.deserialize_any(DeclarationVisitor)
    }
}

/// Parses `[inputs.name]` (one table) or `[[inputs.name]]` (array of tables).
fn parse_input_decl(type_name: String, decl: toml::Value, blocks: &mut Vec<ConfigBlock>) -> Result<(), DocumentError> {
    let path = format!("inputs.{type_name}");
    match decl {
        toml::Value::Table(table) => {
            blocks.push(ConfigBlock::from_table(type_name, table)?);
        }
        toml::Value::Array(array) => {
            for (i, item) in array.into_iter().enumerate() {
                let table = expect_table(item, &format!("{path}[{i}]"))?;
                blocks.push(ConfigBlock::from_table(type_name.clone(), table)?);
            }
        }
        other => return Err(BadTypeError::new(path, "table or array of tables", &other).into()),
    }
    Ok(())
}

impl ConfigBlock {
    /// Extracts the reserved settings of an input table.
    pub fn from_table(type_name: String, mut table: toml::Table) -> Result<Self, DocumentError> {
        let path = |key: &str| format!("inputs.{type_name}.{key}");

        let filter = FilterSpec {
            pass: take(&mut table, KEY_PASS, |v| string_array(v, &path(KEY_PASS)))?.unwrap_or_default(),
            drop: take(&mut table, KEY_DROP, |v| string_array(v, &path(KEY_DROP)))?.unwrap_or_default(),
            tag_pass: take(&mut table, KEY_TAGPASS, |v| tag_filters(v, &path(KEY_TAGPASS)))?.unwrap_or_default(),
            tag_drop: take(&mut table, KEY_TAGDROP, |v| tag_filters(v, &path(KEY_TAGDROP)))?.unwrap_or_default(),
        };
        let interval = take(&mut table, KEY_INTERVAL, |v| duration(v, &path(KEY_INTERVAL)))?;
        let tags = take(&mut table, KEY_TAGS, |v| string_table(v, &path(KEY_TAGS)))?.unwrap_or_default();
        let name_prefix = take(&mut table, KEY_NAME_PREFIX, |v| string(v, &path(KEY_NAME_PREFIX)))?;
        let name_suffix = take(&mut table, KEY_NAME_SUFFIX, |v| string(v, &path(KEY_NAME_SUFFIX)))?;
        let name_override = take(&mut table, KEY_NAME_OVERRIDE, |v| string(v, &path(KEY_NAME_OVERRIDE)))?;

        Ok(Self {
            type_name,
            fields: table,
            filter,
            interval,
            tags,
            name_prefix,
            name_suffix,
            name_override,
        })
    }
}

/// Removes `key` from the table and converts its value, if present.
fn take<T>(
    table: &mut toml::Table,
    key: &str,
    convert: impl FnOnce(toml::Value) -> Result<T, DocumentError>,
) -> Result<Option<T>, DocumentError> {
    table.remove(key).map(convert).transpose()
}

fn expect_table(value: toml::Value, path: &str) -> Result<toml::Table, DocumentError> {
    match value {
        toml::Value::Table(t) => Ok(t),
        other => Err(BadTypeError::new(path.to_owned(), "table", &other).into()),
    }
}

fn string(value: toml::Value, path: &str) -> Result<String, DocumentError> {
    match value {
        toml::Value::String(s) => Ok(s),
        other => Err(BadTypeError::new(path.to_owned(), "string", &other).into()),
    }
}

fn string_array(value: toml::Value, path: &str) -> Result<Vec<String>, DocumentError> {
    match value {
        toml::Value::Array(array) => array
            .into_iter()
            .enumerate()
            .map(|(i, v)| string(v, &format!("{path}[{i}]")))
            .collect(),
        other => Err(BadTypeError::new(path.to_owned(), "array of strings", &other).into()),
    }
}

fn string_table(value: toml::Value, path: &str) -> Result<BTreeMap<String, String>, DocumentError> {
    expect_table(value, path)?
        .into_iter()
        .map(|(k, v)| {
            let v = string(v, &format!("{path}.{k}"))?;
            Ok((k, v))
        })
        .collect()
}

fn tag_filters(value: toml::Value, path: &str) -> Result<Vec<(String, Vec<String>)>, DocumentError> {
    expect_table(value, path)?
        .into_iter()
        .map(|(tag, values)| {
            let values = string_array(values, &format!("{path}.{tag}"))?;
            Ok((tag, values))
        })
        .collect()
}

/// Accepts a duration string like `"1m30s"`, or a number of seconds.
fn duration(value: toml::Value, path: &str) -> Result<Duration, DocumentError> {
    match value {
        toml::Value::String(s) => humantime::parse_duration(&s).map_err(|source| DocumentError::InvalidDuration {
            path: path.to_owned(),
            source,
        }),
        toml::Value::Integer(secs) if secs >= 0 => Ok(Duration::from_secs(secs as u64)),
        other => Err(BadTypeError::new(path.to_owned(), "duration string or positive integer", &other).into()),
    }
}
