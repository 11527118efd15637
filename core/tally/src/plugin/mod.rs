//! Input plugins.
//!
//! An input plugin collects data points. Tally does not run the plugins: it only
//! builds them from the configuration, see [`crate::config`].
//!
//! ## Writing an input plugin
//!
//! Define a structure that holds the settings of your plugin, derive `Default` and
//! `Deserialize` on it, and implement [`InputPlugin`].
//! The default value is the "zero" instance created before the configuration is applied.
//!
//! ```
//! use serde::Deserialize;
//! use tally::plugin::InputPlugin;
//!
//! #[derive(Debug, Default, Deserialize)]
//! #[serde(default, deny_unknown_fields)]
//! struct Ping {
//!     urls: Vec<String>,
//!     count: u32,
//! }
//!
//! impl InputPlugin for Ping {
//!     fn name() -> &'static str {
//!         "ping"
//!     }
//!
//!     fn description() -> &'static str {
//!         "Ping given url(s) and return statistics"
//!     }
//! }
//! ```
//!
//! Every [`InputPlugin`] is an [`Input`]: the configuration loader only manipulates
//! `Box<dyn Input>`. To make the plugin available, register it in an [`InputRegistry`],
//! for instance with the [`static_inputs`](crate::static_inputs) macro.
//!
//! ## Parsers
//!
//! Plugins that read raw data in a user-chosen format (line protocol, json, ...) also
//! implement [`ParserInput`] and return it from [`InputPlugin::parser_input`].
//! The loader then builds a [`Parser`] from the `data_format` setting and attaches it.
use std::{any::Any, fmt};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::parsers::Parser;

pub use registry::{InputConstructor, InputRegistry};

pub mod fields;
pub mod registry;

/// An input plugin instance, as seen by the configuration loader.
///
/// ## Note for plugin authors
///
/// You should _not_ implement this trait manually, implement [`InputPlugin`] instead.
pub trait Input: fmt::Debug + Send {
    /// The type name of the plugin, for instance `"cpu"`.
    fn name(&self) -> &str;

    /// A one-line description of the plugin.
    fn description(&self) -> &str;

    /// Example of configuration, in TOML, without the section header.
    fn sample_config(&self) -> &str;

    /// Applies the settings of the configuration to the instance.
    ///
    /// Fails if a setting is unknown or has the wrong type.
    fn configure(&mut self, fields: toml::Table) -> Result<(), FieldError>;

    /// Returns the parser capability of the plugin, if it needs a parser.
    fn as_parser_input(&mut self) -> Option<&mut dyn ParserInput>;

    /// Allows to downcast the instance to its concrete type.
    fn as_any(&self) -> &dyn Any;
}

/// Trait for input plugins written in Rust.
///
/// Implement this trait to define your plugin.
pub trait InputPlugin: Default + DeserializeOwned + fmt::Debug + Send + 'static {
    fn name() -> &'static str;

    fn description() -> &'static str;

    fn sample_config() -> &'static str {
        ""
    }

    /// Override this method if the plugin needs a parser.
    fn parser_input(&mut self) -> Option<&mut dyn ParserInput> {
        None
    }
}

/// Capability of the plugins that parse raw data.
pub trait ParserInput {
    fn set_parser(&mut self, parser: Box<dyn Parser>);

    fn parser(&self) -> Option<&dyn Parser>;
}

/// Error returned by [`Input::configure`].
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("unknown field '{0}'")]
    Unknown(String),
    #[error("invalid value")]
    Invalid(#[source] toml::de::Error),
}

// Every InputPlugin is an Input
impl<P: InputPlugin> Input for P {
    fn name(&self) -> &str {
        <P as InputPlugin>::name()
    }

    fn description(&self) -> &str {
        <P as InputPlugin>::description()
    }

    fn sample_config(&self) -> &str {
        <P as InputPlugin>::sample_config()
    }

    fn configure(&mut self, fields: toml::Table) -> Result<(), FieldError> {
        let known = fields::struct_fields::<P>();
        if let Some(unknown) = fields.keys().find(|k| !known.contains(&k.as_str())) {
            return Err(FieldError::Unknown(unknown.clone()));
        }
        *self = toml::Value::Table(fields).try_into::<P>().map_err(FieldError::Invalid)?;
        Ok(())
    }

    fn as_parser_input(&mut self) -> Option<&mut dyn ParserInput> {
        InputPlugin::parser_input(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
