use std::{io, path::PathBuf};

use thiserror::Error;

use crate::{filter::PatternParseError, parsers::UnknownDataFormat};

/// Error returned by [`Config::load_config`](super::Config::load_config) and
/// [`Config::load_directory`](super::Config::load_directory).
///
/// Every error is fatal to the load that produced it: the configuration is left as it
/// was before the call.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config file '{path}'")]
    FileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("config directory '{path}' does not exist or is not a directory")]
    DirectoryNotFound { path: PathBuf },
    #[error("could not load config from '{file}'")]
    Parse {
        file: PathBuf,
        #[source]
        source: DocumentError,
    },
    #[error("{file}: unsupported config section '{section}'")]
    UnsupportedSection { file: PathBuf, section: String },
    #[error("{file}: undefined but requested input: {name}")]
    UnknownPluginType { file: PathBuf, name: String },
    #[error("{file}: input {plugin}: unknown field '{field}'")]
    UnknownField {
        file: PathBuf,
        plugin: String,
        field: String,
    },
    #[error("{file}: input {plugin}: invalid settings")]
    InvalidField {
        file: PathBuf,
        plugin: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("{file}: input {plugin}: invalid filter")]
    InvalidFilter {
        file: PathBuf,
        plugin: String,
        #[source]
        source: PatternParseError,
    },
    #[error("{file}: input {plugin} needs a parser, but none could be attached")]
    MissingParser {
        file: PathBuf,
        plugin: String,
        #[source]
        source: Option<UnknownDataFormat>,
    },
}

/// Why the content of a config file could not be turned into blocks.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("env var substitution failed")]
    Substitution(#[from] InvalidSubstitutionError),
    #[error("invalid TOML config")]
    InvalidToml(#[from] toml::de::Error),
    #[error(transparent)]
    BadType(#[from] BadTypeError),
    #[error("invalid duration for {path}")]
    InvalidDuration {
        path: String,
        #[source]
        source: humantime::DurationError,
    },
    #[error("invalid [agent] section")]
    Agent(#[source] toml::de::Error),
    #[error("unsupported config section '{0}'")]
    UnsupportedSection(String),
}

#[derive(Error, Debug, PartialEq)]
pub enum InvalidSubstitutionError {
    /// The environment variable does not exist.
    #[error("the environment variable {0} does not exist")]
    Missing(String),
    /// The value of the variable is not valid UTF-8.
    #[error("value of env var {0} is not valid UTF-8")]
    InvalidValue(String),
    /// The name of the variable contains a forbidden character.
    #[error("env var name {0:?} is not valid")]
    InvalidName(String),
    /// The substitution syntax has not been used properly.
    #[error("wrong use of the substitution syntax, it should be ${{ENV_VAR}}")]
    WrongSyntax,
}

#[derive(Error, Debug)]
#[error("unexpected type for {path}: expected {expected}, got {actual}")]
pub struct BadTypeError {
    pub path: String,
    pub expected: &'static str,
    pub actual: &'static str,
}

impl BadTypeError {
    pub fn new(path: String, expected: &'static str, actual: &toml::Value) -> Self {
        Self {
            path,
            expected,
            actual: actual.type_str(),
        }
    }
}

impl ConfigError {
    /// The file that caused the error (for a missing directory, the directory).
    pub fn path(&self) -> &std::path::Path {
        match self {
            ConfigError::FileRead { path, .. } | ConfigError::DirectoryNotFound { path } => path,
            ConfigError::Parse { file, .. }
            | ConfigError::UnsupportedSection { file, .. }
            | ConfigError::UnknownPluginType { file, .. }
            | ConfigError::UnknownField { file, .. }
            | ConfigError::InvalidField { file, .. }
            | ConfigError::InvalidFilter { file, .. }
            | ConfigError::MissingParser { file, .. } => file,
        }
    }
}
