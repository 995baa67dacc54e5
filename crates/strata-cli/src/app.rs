//! The `strata` application.
//!
//! [`StrataCli`] owns the loaded configuration, installs logging and
//! dispatches parsed arguments to the handlers.

use crate::cli::{CliArgs, Command, GraphSubcommand};
use crate::config::StrataConfig;
use crate::find_handlers::{self, FindOptions};
use crate::{config_handlers, graph_handlers};
use tracing_subscriber::EnvFilter;

// ============================================================================
// StrataCli
// ============================================================================

/// The command-line application.
#[derive(Debug)]
pub struct StrataCli {
    config: StrataConfig,
    version: String,
}

impl StrataCli {
    /// Create from CLI args, loading config from file/env.
    pub fn from_args(args: &CliArgs) -> strata_core::Result<Self> {
        Ok(Self::new(StrataConfig::load(args.config.as_deref())?))
    }

    /// Create an application around `config`.
    pub fn new(config: StrataConfig) -> Self {
        Self {
            config,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// The loaded configuration.
    pub fn config(&self) -> &StrataConfig {
        &self.config
    }

    /// Install the tracing subscriber, which also receives `log` records
    /// from the library crates.
    ///
    /// `RUST_LOG` wins when set; otherwise `-q` means warn, `-v` debug.
    pub fn init_logging(&self, verbose: bool, quiet: bool) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if quiet {
            EnvFilter::new("warn")
        } else if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        };

        // A subscriber may already be installed (tests).
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }

    /// Run the command in `args`.
    pub async fn run(&self, args: CliArgs) -> anyhow::Result<()> {
        self.init_logging(args.verbose, args.quiet);

        match args.command {
            Some(Command::Find(find)) => {
                let options = FindOptions {
                    schema: find.schema,
                    facts: find.facts,
                    responses: find.responses,
                    query: find.query,
                    compact: find.compact,
                };
                find_handlers::handle_find(&self.config, options).await
            }
            Some(Command::Graph(graph)) => match graph.command {
                GraphSubcommand::Stats { schema, top } => {
                    let schema = self.config.schema_path(schema)?;
                    graph_handlers::handle_stats(&schema, top)?;
                    Ok(())
                }
            },
            Some(Command::Config(config)) => {
                config_handlers::handle_config_command(args.config.as_deref(), config.command)?;
                Ok(())
            }
            Some(Command::Version) => {
                println!("strata {}", self.version);
                Ok(())
            }
            None => {
                println!("strata {}, use --help for usage", self.version);
                Ok(())
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
