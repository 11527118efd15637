#![allow(dead_code)]

use std::path::PathBuf;

use serde::Deserialize;
use tally::{
    parsers::Parser,
    plugin::{InputPlugin, InputRegistry, ParserInput},
    static_inputs,
};

pub fn testdata(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/testdata").join(name)
}

pub fn registry() -> InputRegistry {
    static_inputs![Memcached, Exec, Procstat]
}

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[derive(Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Memcached {
    pub servers: Vec<String>,
    pub unix_sockets: Vec<String>,
}

impl InputPlugin for Memcached {
    fn name() -> &'static str {
        "memcached"
    }

    fn description() -> &'static str {
        "Read metrics from one or many memcached servers"
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Exec {
    pub command: String,
    #[serde(skip)]
    pub parser: Option<Box<dyn Parser>>,
}

impl InputPlugin for Exec {
    fn name() -> &'static str {
        "exec"
    }

    fn description() -> &'static str {
        "Read metrics from one or more commands"
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

#[derive(Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Procstat {
    pub pid_file: String,
    pub exe: String,
    pub pattern: String,
    pub prefix: String,
}

impl InputPlugin for Procstat {
    fn name() -> &'static str {
        "procstat"
    }

    fn description() -> &'static str {
        "Monitor process cpu and memory usage"
    }
}
