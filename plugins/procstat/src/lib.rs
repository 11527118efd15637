use serde::Deserialize;
use tally::plugin::InputPlugin;
use thiserror::Error;

/// Monitors the system resource usage of a process.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Procstat {
    /// File that contains the pid of the process.
    pub pid_file: String,
    /// Executable name (as in `pgrep <exe>`).
    pub exe: String,
    /// Pattern matched against the full command line (as in `pgrep -f <pattern>`).
    pub pattern: String,
    /// Prefix of the field names, e.g. `nginx` gives `nginx_cpu_time`.
    pub prefix: String,
}

/// How the monitored processes are found. The first non-empty setting is used,
/// in this order: pid file, executable, pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessSelector<'a> {
    PidFile(&'a str),
    Exe(&'a str),
    Pattern(&'a str),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("either exe, pid_file or pattern has to be specified")]
pub struct NoSelector;

impl Procstat {
    pub fn selector(&self) -> Result<ProcessSelector<'_>, NoSelector> {
        if !self.pid_file.is_empty() {
            Ok(ProcessSelector::PidFile(&self.pid_file))
        } else if !self.exe.is_empty() {
            Ok(ProcessSelector::Exe(&self.exe))
        } else if !self.pattern.is_empty() {
            Ok(ProcessSelector::Pattern(&self.pattern))
        } else {
            Err(NoSelector)
        }
    }

    /// Name of a field, with the configured prefix.
    pub fn field_name(&self, field: &str) -> String {
        if self.prefix.is_empty() {
            field.to_owned()
        } else {
            format!("{}_{field}", self.prefix)
        }
    }
}

impl InputPlugin for Procstat {
    fn name() -> &'static str {
        "procstat"
    }

    fn description() -> &'static str {
        "Monitor process cpu and memory usage"
    }

    fn sample_config() -> &'static str {
        r#"  ## Must specify one of: pid_file, exe, or pattern
  ## PID file to monitor process
  pid_file = "/var/run/nginx.pid"
  ## executable name (ie, pgrep <exe>)
  # exe = "nginx"
  ## pattern as argument for pgrep (ie, pgrep -f <pattern>)
  # pattern = "nginx"

  ## Field name prefix
  prefix = ""
"#
    }
}
