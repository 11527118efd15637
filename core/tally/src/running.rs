//! Inputs bound to their metadata, ready to be scheduled.

use std::{collections::BTreeMap, time::Duration};

use crate::{filter::Filter, metric::Metric, plugin::Input};

/// An input plugin instance, with its settings.
#[derive(Debug)]
pub struct RunningInput {
    pub input: Box<dyn Input>,
    pub config: InputConfig,
}

/// Settings that are common to every input, extracted from its configuration block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputConfig {
    /// The plugin type name.
    pub name: String,
    pub filter: Filter,
    /// Collection interval. Zero means "use the agent interval".
    pub interval: Duration,
    /// Tags added to every point of this input. Empty if none was declared.
    pub tags: BTreeMap<String, String>,
    pub measurement_suffix: String,
    pub measurement_prefix: String,
    /// Replaces the measurement name, if not empty.
    pub name_override: String,
}

impl InputConfig {
    /// Creates a configuration with no filter, no tags and the default interval.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Applies the naming settings to a measurement name: override, then prefix and suffix.
    pub fn measurement_name(&self, base: &str) -> String {
        let name = if self.name_override.is_empty() {
            base
        } else {
            self.name_override.as_str()
        };
        format!("{}{name}{}", self.measurement_prefix, self.measurement_suffix)
    }
}

impl RunningInput {
    pub fn new(input: Box<dyn Input>, config: InputConfig) -> Self {
        Self { input, config }
    }

    /// The plugin type name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Applies the filter of this input to a point that it produced.
    pub fn should_pass(&self, metric: &Metric) -> bool {
        self.config.filter.should_pass_metric(metric)
    }

    /// Returns the plugin instance as a `T`, if it is one.
    pub fn input_as<T: 'static>(&self) -> Option<&T> {
        self.input.as_any().downcast_ref::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::InputConfig;

    #[test]
    fn measurement_name() {
        let mut config = InputConfig::new("exec");
        assert_eq!(config.measurement_name("exec"), "exec");

        config.measurement_suffix = String::from("_myothercollector");
        assert_eq!(config.measurement_name("exec"), "exec_myothercollector");

        config.measurement_prefix = String::from("sys_");
        config.name_override = String::from("collector");
        assert_eq!(config.measurement_name("exec"), "sys_collector_myothercollector");
    }

    #[test]
    fn tags_are_never_absent() {
        let config = InputConfig::new("cpu");
        assert!(config.tags.is_empty());
        assert!(!config.filter.is_active());
    }
}
