use std::time::Duration;

use serde::Deserialize;
use tally::{
    metric::Metric,
    parsers::{ParseError, Parser},
    plugin::{InputPlugin, ParserInput},
};
use thiserror::Error;

/// Runs commands and parses their output with the configured data format.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Exec {
    /// Command line to run, e.g. `"/usr/bin/mycollector --foo=bar"`.
    pub command: String,
    /// Additional command lines.
    pub commands: Vec<String>,
    /// Maximum run time of each command.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(skip)]
    parser: Option<Box<dyn Parser>>,
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("no parser attached to the exec input")]
    NoParser,
    #[error("invalid output")]
    Parse(#[from] ParseError),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unterminated quote in command: {0}")]
pub struct UnterminatedQuote(pub String);

impl Default for Exec {
    fn default() -> Self {
        Self {
            command: String::new(),
            commands: Vec::new(),
            timeout: Duration::from_secs(5),
            parser: None,
        }
    }
}

impl Exec {
    /// Every command line to run: `command` first, then `commands`.
    pub fn command_lines(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.command.as_str())
            .chain(self.commands.iter().map(String::as_str))
            .filter(|c| !c.trim().is_empty())
    }

    /// Turns the output of a command into metrics, with the attached parser.
    pub fn parse_output(&self, output: &[u8]) -> Result<Vec<Metric>, ExecError> {
        let parser = self.parser.as_deref().ok_or(ExecError::NoParser)?;
        Ok(parser.parse(output)?)
    }
}

/// Splits a command line into a program and its arguments.
///
/// Arguments are separated by whitespace, single and double quotes group words.
pub fn split_command(line: &str) -> Result<Vec<String>, UnterminatedQuote> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote = None;
    for c in line.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    args.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if quote.is_some() {
        return Err(UnterminatedQuote(line.to_owned()));
    }
    if in_word {
        args.push(current);
    }
    Ok(args)
}

impl InputPlugin for Exec {
    fn name() -> &'static str {
        "exec"
    }

    fn description() -> &'static str {
        "Read flattened metrics from one or more commands that output JSON to stdout"
    }

    fn sample_config() -> &'static str {
        r#"  ## Commands array
  command = "/usr/bin/mycollector --foo=bar"

  ## Timeout for each command to complete.
  timeout = "5s"

  ## measurement name suffix (for separating different commands)
  name_suffix = "_mycollector"

  ## Data format to consume. This can be "json" or "influx" (line-protocol)
  data_format = "influx"
"#
    }

    fn parser_input(&mut self) -> Option<&mut dyn ParserInput> {
        Some(self)
    }
}

impl ParserInput for Exec {
    fn set_parser(&mut self, parser: Box<dyn Parser>) {
        self.parser = Some(parser);
    }

    fn parser(&self) -> Option<&dyn Parser> {
        self.parser.as_deref()
    }
}
