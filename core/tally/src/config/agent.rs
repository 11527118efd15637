use std::time::Duration;

use serde::{de::Error as _, Deserialize, Serialize};

/// Agent-wide settings, from the `[agent]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    /// Default collection interval, for the inputs that do not set their own.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Rounds collection to multiples of `interval` (e.g. `:00`, `:10`, `:20` for 10s).
    pub round_interval: bool,
    /// Interval between two flushes of the outputs.
    #[serde(with = "humantime_serde")]
    pub flush_interval: Duration,
    /// Random delay added to each flush, to avoid thundering herds.
    #[serde(with = "humantime_serde")]
    pub flush_jitter: Duration,
    /// Maximum number of points kept in memory when an output is unavailable.
    pub metric_buffer_limit: usize,
    pub debug: bool,
    pub quiet: bool,
    /// Overrides the hostname of the machine. Empty means "use the system hostname".
    pub hostname: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            round_interval: true,
            flush_interval: Duration::from_secs(10),
            flush_jitter: Duration::ZERO,
            metric_buffer_limit: 10_000,
            debug: false,
            quiet: false,
            hostname: String::new(),
        }
    }
}

impl AgentConfig {
    /// Applies the settings of an `[agent]` table on top of these ones.
    ///
    /// The keys that are missing from `table` keep their current value.
    pub fn merged(&self, table: toml::Table) -> Result<Self, toml::de::Error> {
        let mut current = match toml::Value::try_from(self).map_err(toml::de::Error::custom)? {
            toml::Value::Table(current) => current,
            other => return Err(toml::de::Error::custom(format!("agent settings are a {}", other.type_str()))),
        };
        current.extend(table);
        toml::Value::Table(current).try_into()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::AgentConfig;

    #[test]
    fn partial_section() {
        let config: AgentConfig = toml::from_str(
            r#"
            interval = "1m"
            debug = true
            "#,
        )
        .unwrap();
        assert_eq!(
            config,
            AgentConfig {
                interval: Duration::from_secs(60),
                debug: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn unknown_setting() {
        assert!(toml::from_str::<AgentConfig>("intervall = \"1s\"").is_err());
    }

    #[test]
    fn serialize_default() {
        let s = toml::to_string(&AgentConfig::default()).unwrap();
        assert!(s.contains("interval = \"10s\""), "unexpected serialization: {s}");
        assert!(s.contains("flush_jitter = \"0s\""), "unexpected serialization: {s}");
    }

    #[test]
    fn merge_keeps_unset_keys() {
        let base = AgentConfig {
            hostname: String::from("db01"),
            metric_buffer_limit: 50,
            ..Default::default()
        };
        let merged = base.merged(toml::toml! { interval = "30s" }).unwrap();
        assert_eq!(
            merged,
            AgentConfig {
                interval: Duration::from_secs(30),
                ..base.clone()
            }
        );

        let merged = merged.merged(toml::toml! { hostname = "db02" }).unwrap();
        assert_eq!(merged.hostname, "db02");
        assert_eq!(merged.interval, Duration::from_secs(30));
        assert_eq!(merged.metric_buffer_limit, 50);
    }

    #[test]
    fn merge_rejects_unknown_setting() {
        let res = AgentConfig::default().merged(toml::toml! { intervall = "1s" });
        assert!(res.is_err());
    }
}
