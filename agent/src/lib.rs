use tally::{plugin::InputRegistry, static_inputs};

/// Initializes the global logger. The default level is `info`, `RUST_LOG` overrides it.
pub fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// The input plugins built into the agent.
pub fn registry() -> InputRegistry {
    static_inputs![
        plugin_exec::Exec,
        plugin_memcached::Memcached,
        plugin_procstat::Procstat,
    ]
}

/// Splits the value of `--input-filter`: `cpu:mem` gives `["cpu", "mem"]`.
pub fn parse_input_filter(s: &str) -> Vec<String> {
    s.split(':')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}
