use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tally::{plugin::InputRegistry, Config};
use tally_agent::{init_logger, parse_input_filter, registry};

const BINARY: &str = env!("CARGO_BIN_NAME");

/// Main agent function.
///
/// The steps are:
/// - build the registry of the available plugins
/// - parse the CLI
/// - run the command, loading the config files if needed
///
/// About errors: we use `anyhow::Result` and `context` instead of `expect` to get
/// nicer error messages (`expect` prints errors with `Debug`).
fn main() -> anyhow::Result<()> {
    init_logger();

    let registry = registry();
    let args = cli::Cli::parse();
    log::debug!("starting {BINARY} v{}", env!("CARGO_PKG_VERSION"));

    match args.command.unwrap_or(cli::Command::Check) {
        cli::Command::Check => {
            let config = load(&registry, &args.common)?;
            print_inputs(&config);
        }
        cli::Command::SampleConfig => {
            let sample = Config::sample_config(&registry).context("could not generate the sample config")?;
            print!("{sample}");
        }
        cli::Command::Plugins => {
            println!("Available plugins:");
            for name in registry.names() {
                if let Some(input) = registry.create(name) {
                    println!("- {name}: {}", input.description());
                }
            }
        }
    }
    Ok(())
}

/// Loads the config file, then the config directory if there is one.
fn load<'r>(registry: &'r InputRegistry, args: &cli::CommonArgs) -> anyhow::Result<Config<'r>> {
    let input_filter = args.input_filter.as_deref().map(parse_input_filter).unwrap_or_default();
    let mut config = Config::new(registry).with_input_filter(input_filter);

    let file = Path::new(&args.config);
    config
        .load_config(file)
        .with_context(|| format!("could not load config file {}", file.display()))?;

    if let Some(dir) = &args.config_directory {
        config
            .load_directory(dir)
            .with_context(|| format!("could not load config directory {dir}"))?;
    }
    Ok(config)
}

fn print_inputs(config: &Config<'_>) {
    println!("Loaded {} inputs:", config.inputs().len());
    for input in config.inputs() {
        let interval = config.effective_interval(input);
        let filter = if input.config.filter.is_active() {
            "filtered"
        } else {
            "unfiltered"
        };
        let tags: Vec<_> = input.config.tags.iter().map(|(k, v)| format!("{k}={v}")).collect();
        println!(
            "- {} (interval: {}, {filter}, tags: [{}])",
            input.config.measurement_name(input.name()),
            humantime::format_duration(interval),
            tags.join(", ")
        );
    }
}

mod cli {
    use clap::{Args, Parser, Subcommand};

    // NOTE: the doc comment attached to `Cli` is used by clap as the description of
    // the application. It is displayed at the start of the help message.

    /// Tally agent: resolve the configuration of telemetry inputs.
    #[derive(Parser)]
    #[command(version)]
    pub struct Cli {
        #[command(subcommand)]
        pub command: Option<Command>,

        #[command(flatten)]
        pub common: CommonArgs,
    }

    #[derive(Subcommand)]
    pub enum Command {
        /// Load the configuration and print the resolved inputs.
        ///
        /// This is the default command.
        Check,

        /// Print a sample configuration with every available plugin.
        SampleConfig,

        /// Print the available plugins.
        Plugins,
    }

    /// Common CLI arguments.
    #[derive(Args, Clone)]
    pub struct CommonArgs {
        /// Path to the config file.
        #[arg(long, env = "TALLY_CONFIG", default_value = "tally.conf", global = true)]
        pub config: String,

        /// Directory of additional config files, loaded after the config file in name order.
        #[arg(long, env = "TALLY_CONFIG_DIRECTORY", global = true)]
        pub config_directory: Option<String>,

        /// Inputs to load, separated by colons, ex. `memcached:exec`.
        ///
        /// The other inputs of the config are ignored.
        #[arg(long, global = true)]
        pub input_filter: Option<String>,
    }
}
