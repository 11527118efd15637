//! Configuration loading.
//!
//! A [`Config`] resolves configuration files into an ordered list of [`RunningInput`].
//! The list is built by [`Config::load_config`], which replaces it, and extended by
//! [`Config::load_directory`], which appends the inputs of every file of a directory,
//! in file name order.
//!
//! ```no_run
//! use tally::{config::Config, plugin::InputRegistry};
//!
//! # fn main() -> Result<(), tally::config::ConfigError> {
//! let registry = InputRegistry::new();
//! let mut config = Config::new(&registry);
//! config.load_config("/etc/tally/tally.conf")?;
//! config.load_directory("/etc/tally/tally.d")?;
//! for input in config.inputs() {
//!     println!("{} every {:?}", input.name(), config.effective_interval(input));
//! }
//! # Ok(())
//! # }
//! ```
use std::{
    collections::BTreeMap,
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{plugin::InputRegistry, running::RunningInput};

pub use agent::AgentConfig;
pub use document::{ConfigBlock, Document, RESERVED_KEYS};
pub use error::{BadTypeError, ConfigError, DocumentError, InvalidSubstitutionError};
pub use substitute::substitute_env;

mod agent;
mod bind;
pub mod document;
mod error;
mod substitute;

/// Extensions of the files picked by [`Config::load_directory`].
pub const CONFIG_FILE_EXTENSIONS: [&str; 2] = ["conf", "toml"];

/// The resolved configuration of an agent.
#[derive(Debug)]
pub struct Config<'r> {
    registry: &'r InputRegistry,
    agent: AgentConfig,
    tags: BTreeMap<String, String>,
    input_filter: Vec<String>,
    inputs: Vec<RunningInput>,
}

/// What one file contributes to the configuration.
struct Loaded {
    agent: Option<toml::Table>,
    tags: Option<BTreeMap<String, String>>,
    inputs: Vec<RunningInput>,
}

impl<'r> Config<'r> {
    /// Creates an empty configuration that resolves the plugins with `registry`.
    pub fn new(registry: &'r InputRegistry) -> Self {
        Self {
            registry,
            agent: AgentConfig::default(),
            tags: BTreeMap::new(),
            input_filter: Vec::new(),
            inputs: Vec::new(),
        }
    }

    /// Only binds the inputs whose type is in `names`. An empty list binds everything.
    pub fn with_input_filter(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.input_filter = names.into_iter().map(Into::into).collect();
        self
    }

    /// Loads a configuration file and replaces the current inputs, agent settings and tags.
    ///
    /// On error, the configuration is left unchanged.
    pub fn load_config(&mut self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let loaded = self.load_file(path)?;
        let agent = merge_agent(&AgentConfig::default(), loaded.agent, path)?;
        self.inputs = loaded.inputs;
        self.agent = agent;
        self.tags = loaded.tags.unwrap_or_default();
        Ok(())
    }

    /// Loads every config file of a directory, sorted by name, and appends their inputs.
    ///
    /// The `[agent]` keys and the tags of the files override the current ones, key by key:
    /// a file that only sets `interval` keeps the other agent settings. Either every file
    /// is loaded, or the configuration is left unchanged.
    pub fn load_directory(&mut self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let files = config_files(path)?;

        let mut staged_inputs = Vec::new();
        let mut staged_agent = self.agent.clone();
        let mut staged_tags = BTreeMap::new();
        for file in &files {
            let loaded = self.load_file(file)?;
            staged_inputs.extend(loaded.inputs);
            staged_agent = merge_agent(&staged_agent, loaded.agent, file)?;
            if let Some(tags) = loaded.tags {
                staged_tags.extend(tags);
            }
        }

        log::debug!(
            "loaded {} inputs from {} files in {}",
            staged_inputs.len(),
            files.len(),
            path.display()
        );
        self.inputs.extend(staged_inputs);
        self.agent = staged_agent;
        self.tags.extend(staged_tags);
        Ok(())
    }

    fn load_file(&self, path: &Path) -> Result<Loaded, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_owned(),
            source,
        })?;
        let doc = document::parse(&content).map_err(|e| match e {
            DocumentError::UnsupportedSection(section) => ConfigError::UnsupportedSection {
                file: path.to_owned(),
                section,
            },
            source => ConfigError::Parse {
                file: path.to_owned(),
                source,
            },
        })?;

        let mut inputs = Vec::with_capacity(doc.inputs.len());
        for block in doc.inputs {
            if !self.is_selected(&block.type_name) {
                log::debug!("skipping input {}: excluded by the input filter", block.type_name);
                continue;
            }
            let input = bind::bind(self.registry, block, path)?;
            log::debug!(
                "bound input {} (interval: {:?}, filter active: {})",
                input.name(),
                input.config.interval,
                input.config.filter.is_active()
            );
            inputs.push(input);
        }
        log::info!("loaded {} inputs from {}", inputs.len(), path.display());
        Ok(Loaded {
            agent: doc.agent,
            tags: doc.tags,
            inputs,
        })
    }

    fn is_selected(&self, type_name: &str) -> bool {
        self.input_filter.is_empty() || self.input_filter.iter().any(|name| name == type_name)
    }

    /// The resolved inputs, in load order.
    pub fn inputs(&self) -> &[RunningInput] {
        &self.inputs
    }

    pub fn into_inputs(self) -> Vec<RunningInput> {
        self.inputs
    }

    /// The type names of the resolved inputs, in load order (with duplicates).
    pub fn input_names(&self) -> Vec<&str> {
        self.inputs.iter().map(RunningInput::name).collect()
    }

    pub fn agent(&self) -> &AgentConfig {
        &self.agent
    }

    /// Global tags.
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// The collection interval of an input: its own, or the agent interval if it has none.
    pub fn effective_interval(&self, input: &RunningInput) -> Duration {
        if input.config.interval.is_zero() {
            self.agent.interval
        } else {
            input.config.interval
        }
    }

    /// Renders a commented configuration with the agent defaults and every registered input.
    pub fn sample_config(registry: &InputRegistry) -> Result<String, toml::ser::Error> {
        let agent = toml::to_string(&AgentConfig::default())?;
        let mut out = format!("# Agent settings\n[agent]\n{agent}\n# Global tags\n[tags]\n");
        for name in registry.names() {
            let Some(input) = registry.create(name) else {
                continue;
            };
            out.push_str(&format!("\n# {}\n[[inputs.{name}]]\n", input.description()));
            out.push_str(input.sample_config());
        }
        Ok(out)
    }
}

/// Applies the `[agent]` section of `file`, if any, on top of `agent`.
fn merge_agent(agent: &AgentConfig, table: Option<toml::Table>, file: &Path) -> Result<AgentConfig, ConfigError> {
    match table {
        Some(table) => agent.merged(table).map_err(|e| ConfigError::Parse {
            file: file.to_owned(),
            source: DocumentError::Agent(e),
        }),
        None => Ok(agent.clone()),
    }
}

/// Lists the config files of a directory, sorted by name.
fn config_files(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let not_found = || ConfigError::DirectoryNotFound { path: dir.to_owned() };
    if !dir.is_dir() {
        return Err(not_found());
    }
    let read_err = |source| ConfigError::FileRead {
        path: dir.to_owned(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        let has_config_ext = path
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| CONFIG_FILE_EXTENSIONS.contains(&ext));
        if has_config_ext && path.is_file() {
            files.push(path);
        } else {
            log::debug!("ignoring {} in config directory", path.display());
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}
