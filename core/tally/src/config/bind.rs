//! Turns a [`ConfigBlock`] into a [`RunningInput`].

use std::path::Path;

use serde::Deserialize;

use super::{document::ConfigBlock, error::ConfigError};
use crate::{
    filter::Filter,
    parsers::{self, ParserConfig},
    plugin::{FieldError, InputRegistry},
    running::{InputConfig, RunningInput},
};

/// Settings that select the parser of the inputs that need one.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ParserSettings {
    data_format: String,
    tag_keys: Vec<String>,
}

const PARSER_KEYS: [&str; 2] = ["data_format", "tag_keys"];

/// Creates the plugin instance of `block` and applies its configuration.
///
/// `file` is only used for error reporting.
pub(crate) fn bind(registry: &InputRegistry, block: ConfigBlock, file: &Path) -> Result<RunningInput, ConfigError> {
    let ConfigBlock {
        type_name,
        mut fields,
        filter,
        interval,
        tags,
        name_prefix,
        name_suffix,
        name_override,
    } = block;

    let constructor = registry.lookup(&type_name).ok_or_else(|| ConfigError::UnknownPluginType {
        file: file.to_owned(),
        name: type_name.clone(),
    })?;
    let mut input = constructor();

    // The parser settings are not plugin fields: remove them before configuring the plugin.
    let parser_config = if input.as_parser_input().is_some() {
        let mut parser_table = toml::Table::new();
        for key in PARSER_KEYS {
            if let Some(v) = fields.remove(key) {
                parser_table.insert(key.to_owned(), v);
            }
        }
        let settings: ParserSettings = toml::Value::Table(parser_table).try_into().map_err(|source| {
            ConfigError::InvalidField {
                file: file.to_owned(),
                plugin: type_name.clone(),
                source,
            }
        })?;
        Some(ParserConfig {
            data_format: settings.data_format,
            metric_name: type_name.clone(),
            tag_keys: settings.tag_keys,
            ..Default::default()
        })
    } else {
        None
    };

    input.configure(fields).map_err(|e| match e {
        FieldError::Unknown(field) => ConfigError::UnknownField {
            file: file.to_owned(),
            plugin: type_name.clone(),
            field,
        },
        FieldError::Invalid(source) => ConfigError::InvalidField {
            file: file.to_owned(),
            plugin: type_name.clone(),
            source,
        },
    })?;

    if let Some(parser_config) = parser_config {
        let missing_parser = |source| ConfigError::MissingParser {
            file: file.to_owned(),
            plugin: type_name.clone(),
            source,
        };
        let parser = parsers::new_parser(&parser_config).map_err(|e| missing_parser(Some(e)))?;
        let format = parser.data_format();
        let parser_input = input.as_parser_input().ok_or_else(|| missing_parser(None))?;
        parser_input.set_parser(parser);
        if parser_input.parser().is_none() {
            return Err(missing_parser(None));
        }
        log::debug!("attached a {format} parser to input {type_name}");
    }

    let filter = Filter::compile(filter).map_err(|source| ConfigError::InvalidFilter {
        file: file.to_owned(),
        plugin: type_name.clone(),
        source,
    })?;

    let config = InputConfig {
        name: type_name,
        filter,
        interval: interval.unwrap_or_default(),
        tags,
        measurement_suffix: name_suffix.unwrap_or_default(),
        measurement_prefix: name_prefix.unwrap_or_default(),
        name_override: name_override.unwrap_or_default(),
    };
    Ok(RunningInput::new(input, config))
}
