//! TALLY: configuration resolution for plugin-based telemetry agents.
//!
//! A telemetry agent runs a set of _input plugins_ that collect data points (cpu usage,
//! memcached statistics, output of a command, etc.). Which plugins run, and how, is
//! declared in TOML configuration files.
//!
//! # This crate
//! This crate turns the configuration files into a list of ready-to-run inputs:
//! 1. Parse the files into [blocks](config::ConfigBlock), one per input declaration.
//! 2. Build each input with the [registry](plugin::InputRegistry) of available plugins,
//!    and apply its settings.
//! 3. Compile the pass/drop rules of each input into a [`Filter`](filter::Filter),
//!    which decides whether a data point produced by the input is kept.
//!
//! The result is a list of [`RunningInput`](running::RunningInput), in a deterministic order.
//! Running the inputs is the job of the agent.
//!
//! Learn how to make plugins by reading the documentation of the [`plugin`] module,
//! and how to load a configuration in the [`config`] module.

pub mod config;
pub mod filter;
pub mod metric;
pub mod parsers;
pub mod plugin;
pub mod running;

pub use config::{Config, ConfigError};
pub use running::{InputConfig, RunningInput};
