use std::{fs, time::Duration};

use indoc::indoc;
use pretty_assertions::assert_eq;
use tally::{
    config::{AgentConfig, Config, ConfigError, DocumentError},
    parsers::DataFormat,
};

mod common;
use common::{registry, strings, testdata, Exec, Memcached, Procstat};

#[test]
fn merge_subconfig() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let registry = registry();
    let mut config = Config::new(&registry);
    config.load_config(testdata("single_plugin.toml"))?;
    config.load_directory(testdata("subconfig"))?;

    assert_eq!(config.input_names(), vec!["memcached", "exec", "memcached", "procstat"]);
    let inputs = config.inputs();

    let first = inputs[0].input_as::<Memcached>().unwrap();
    assert_eq!(first.servers, strings(&["localhost"]));

    let exec = inputs[1].input_as::<Exec>().unwrap();
    assert_eq!(exec.command, "/usr/bin/myothercollector --foo=bar");
    let parser = exec.parser.as_ref().expect("the exec input should have a parser");
    assert_eq!(parser.data_format(), DataFormat::Influx);
    assert_eq!(inputs[1].config.measurement_suffix, "_myothercollector");
    assert_eq!(inputs[1].config.measurement_name("exec"), "exec_myothercollector");
    assert!(!inputs[1].config.filter.is_active());
    assert!(inputs[1].config.tags.is_empty());

    let second = inputs[2].input_as::<Memcached>().unwrap();
    assert_eq!(second.servers, strings(&["192.168.1.1"]));
    // same settings as the main file, but a distinct entry
    assert_eq!(inputs[2].config, inputs[0].config);
    assert_eq!(inputs[2].config.interval, Duration::from_secs(5));

    let procstat = inputs[3].input_as::<Procstat>().unwrap();
    assert_eq!(procstat.pid_file, "/var/run/grafana-server.pid");
    Ok(())
}

#[test]
fn files_are_sorted_by_name() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("b.conf"), "[[inputs.procstat]]\n")?;
    fs::write(dir.path().join("a.conf"), "[[inputs.memcached]]\n[[inputs.exec]]\n")?;
    fs::write(dir.path().join("c.toml"), "[[inputs.memcached]]\n")?;
    fs::write(dir.path().join("ignored.txt"), "[[inputs.unknown]]\n")?;

    let main = tempfile::NamedTempFile::new()?;
    fs::write(main.path(), "[[inputs.exec]]\n")?;

    let registry = registry();
    let mut config = Config::new(&registry);
    config.load_config(main.path())?;
    config.load_directory(dir.path())?;
    assert_eq!(
        config.input_names(),
        vec!["exec", "memcached", "exec", "procstat", "memcached"]
    );
    Ok(())
}

#[test]
fn appends_without_main_file() -> anyhow::Result<()> {
    let registry = registry();
    let mut config = Config::new(&registry);
    config.load_directory(testdata("subconfig"))?;
    config.load_directory(testdata("subconfig"))?;
    assert_eq!(
        config.input_names(),
        vec!["exec", "memcached", "procstat", "exec", "memcached", "procstat"]
    );
    Ok(())
}

#[test]
fn empty_directory() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let registry = registry();
    let mut config = Config::new(&registry);
    config.load_config(testdata("single_plugin.toml"))?;
    config.load_directory(dir.path())?;
    assert_eq!(config.input_names(), vec!["memcached"]);
    Ok(())
}

#[test]
fn missing_directory() {
    let registry = registry();
    let mut config = Config::new(&registry);
    let res = config.load_directory(testdata("does-not-exist"));
    assert!(matches!(res, Err(ConfigError::DirectoryNotFound { .. })));
}

#[test]
fn failure_rolls_back_the_whole_directory() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(
        dir.path().join("10-good.conf"),
        indoc! {r#"
            [agent]
              interval = "1m"
            [tags]
              rack = "r1"
            [[inputs.memcached]]
        "#},
    )?;
    fs::write(dir.path().join("20-bad.conf"), "[[inputs.memcached]]\n[[inputs.postgresql]]\n")?;

    let registry = registry();
    let mut config = Config::new(&registry);
    config.load_config(testdata("single_plugin.toml"))?;

    let err = config.load_directory(dir.path()).unwrap_err();
    assert!(matches!(&err, ConfigError::UnknownPluginType { name, .. } if name == "postgresql"));
    assert_eq!(err.path(), dir.path().join("20-bad.conf"));

    assert_eq!(config.input_names(), vec!["memcached"]);
    assert_eq!(config.agent().interval, Duration::from_secs(10));
    assert!(config.tags().is_empty());
    Ok(())
}

#[test]
fn agent_keys_and_tags_merged() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let main = dir.path().join("tally.conf");
    let sub = dir.path().join("tally.d");
    fs::create_dir(&sub)?;
    fs::write(
        &main,
        indoc! {r#"
            [agent]
              interval = "1m"
              hostname = "db01"
              metric_buffer_limit = 50
            [tags]
              dc = "eu"
              rack = "r1"
        "#},
    )?;
    fs::write(sub.join("a.conf"), "[agent]\ndebug = true\n[tags]\nrack = \"r2\"\n")?;
    fs::write(sub.join("b.conf"), "[agent]\ninterval = \"30s\"\n[tags]\nrole = \"cache\"\n")?;

    let registry = registry();
    let mut config = Config::new(&registry);
    config.load_config(&main)?;
    config.load_directory(&sub)?;

    // only the keys set by the directory files change
    let expected = AgentConfig {
        interval: Duration::from_secs(30),
        hostname: String::from("db01"),
        metric_buffer_limit: 50,
        debug: true,
        ..Default::default()
    };
    assert_eq!(config.agent(), &expected);
    let tags: Vec<_> = config.tags().iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    assert_eq!(tags, vec![("dc", "eu"), ("rack", "r2"), ("role", "cache")]);
    Ok(())
}

#[test]
fn invalid_agent_key_in_directory() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("agent.conf"), "[agent]\nflush_intervall = \"1s\"\n")?;

    let registry = registry();
    let mut config = Config::new(&registry);
    let err = config.load_directory(dir.path()).unwrap_err();
    assert!(matches!(&err, ConfigError::Parse { source: DocumentError::Agent(_), .. }));
    assert_eq!(err.path(), dir.path().join("agent.conf"));
    assert_eq!(config.agent(), &AgentConfig::default());
    Ok(())
}

#[test]
fn input_filter_applies_to_directories() -> anyhow::Result<()> {
    let registry = registry();
    let mut config = Config::new(&registry).with_input_filter(["memcached", "procstat"]);
    config.load_directory(testdata("subconfig"))?;
    assert_eq!(config.input_names(), vec!["memcached", "procstat"]);
    Ok(())
}
