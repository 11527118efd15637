use serde::Deserialize;
use tally::plugin::InputPlugin;

/// Address used when no server and no socket is configured.
pub const DEFAULT_SERVER: &str = "localhost:11211";
const DEFAULT_PORT: u16 = 11211;

/// Reads the statistics of one or more memcached servers.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Memcached {
    /// TCP servers, as `host` or `host:port`.
    pub servers: Vec<String>,
    /// Unix sockets.
    pub unix_sockets: Vec<String>,
}

/// Where to connect to a memcached server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Tcp(String),
    Unix(String),
}

impl Memcached {
    /// The servers to query, with the default port added when missing.
    pub fn targets(&self) -> Vec<Target> {
        if self.servers.is_empty() && self.unix_sockets.is_empty() {
            return vec![Target::Tcp(String::from(DEFAULT_SERVER))];
        }
        let tcp = self.servers.iter().map(|s| Target::Tcp(with_default_port(s)));
        let unix = self.unix_sockets.iter().cloned().map(Target::Unix);
        tcp.chain(unix).collect()
    }
}

fn with_default_port(server: &str) -> String {
    // "[::1]:11211" or "host:11211", but not "::1"
    let has_port = match server.rsplit_once(':') {
        Some((host, port)) => port.parse::<u16>().is_ok() && (!host.contains(':') || host.ends_with(']')),
        None => false,
    };
    if has_port {
        server.to_owned()
    } else if server.contains(':') && !server.starts_with('[') {
        // bare IPv6 address
        format!("[{server}]:{DEFAULT_PORT}")
    } else {
        format!("{server}:{DEFAULT_PORT}")
    }
}

impl InputPlugin for Memcached {
    fn name() -> &'static str {
        "memcached"
    }

    fn description() -> &'static str {
        "Read metrics from one or many memcached servers"
    }

    fn sample_config() -> &'static str {
        r#"  ## An array of address to gather stats about. Specify an ip on hostname
  ## with optional port. ie localhost, 10.0.0.1:11211, etc.
  servers = ["localhost:11211"]
  # unix_sockets = ["/var/run/memcached.sock"]
"#
    }
}
