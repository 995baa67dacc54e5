//! CLI argument parsing and command definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

// ============================================================================
// CLI argument types
// ============================================================================

/// Top-level arguments for `strata`.
#[derive(Parser, Debug)]
#[command(name = "strata", author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file.
    #[arg(short, long, env = "STRATA_CONFIG")]
    pub config: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-essential output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Answer a query from known facts.
    Find(FindArgs),

    /// Schema graph operations.
    Graph(GraphCommand),

    /// Configuration operations.
    Config(ConfigCommand),

    /// Print version information.
    Version,
}

/// Arguments of `strata find`.
#[derive(Args, Debug)]
pub struct FindArgs {
    /// Schema definition (JSON). Falls back to `paths.schema`.
    #[arg(short, long)]
    pub schema: Option<PathBuf>,

    /// Known facts: a JSON array of `{"type": ..., "value": ...}`.
    #[arg(short, long)]
    pub facts: Option<PathBuf>,

    /// Canned operation responses (JSON). Falls back to `paths.responses`.
    #[arg(short, long)]
    pub responses: Option<PathBuf>,

    /// Print the result on one line.
    #[arg(long)]
    pub compact: bool,

    /// The query, e.g. `"Total, Region"` or `"gather OrderId"`.
    pub query: String,
}

/// Graph-specific subcommands.
#[derive(Parser, Debug)]
pub struct GraphCommand {
    /// Graph subcommand to execute.
    #[command(subcommand)]
    pub command: GraphSubcommand,
}

/// Available graph subcommands.
#[derive(Subcommand, Debug)]
pub enum GraphSubcommand {
    /// Show schema graph statistics.
    Stats {
        /// Schema definition (JSON). Falls back to `paths.schema`.
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// How many of the most connected elements to list.
        #[arg(short, long, default_value = "5")]
        top: usize,
    },
}

/// Config-specific subcommands.
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    /// Config subcommand to execute.
    #[command(subcommand)]
    pub command: ConfigAction,
}

/// Available config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the resolved config file path.
    Path,

    /// Print the effective configuration as TOML.
    Show,

    /// Create a default configuration file.
    Init {
        /// Output file path (defaults to XDG config path).
        #[arg(short, long)]
        file: Option<String>,

        /// Overwrite existing file.
        #[arg(long)]
        force: bool,
    },
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_find() {
        let args = CliArgs::parse_from([
            "strata",
            "find",
            "--schema",
            "schema.json",
            "--facts",
            "facts.json",
            "Total, Region",
        ]);
        match args.command {
            Some(Command::Find(find)) => {
                assert_eq!(find.schema, Some(PathBuf::from("schema.json")));
                assert_eq!(find.facts, Some(PathBuf::from("facts.json")));
                assert!(find.responses.is_none());
                assert!(!find.compact);
                assert_eq!(find.query, "Total, Region");
            }
            other => unreachable!("expected find, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_graph_stats_defaults() {
        let args = CliArgs::parse_from(["strata", "graph", "stats", "-s", "schema.json"]);
        match args.command {
            Some(Command::Graph(GraphCommand {
                command: GraphSubcommand::Stats { schema, top },
            })) => {
                assert_eq!(schema, Some(PathBuf::from("schema.json")));
                assert_eq!(top, 5);
            }
            other => unreachable!("expected graph stats, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_config_init() {
        let args = CliArgs::parse_from(["strata", "-q", "config", "init", "--force"]);
        assert!(args.quiet);
        assert!(matches!(
            args.command,
            Some(Command::Config(ConfigCommand {
                command: ConfigAction::Init { file: None, force: true }
            }))
        ));
    }

    #[test]
    fn test_find_requires_query() {
        assert!(CliArgs::try_parse_from(["strata", "find", "--schema", "s.json"]).is_err());
    }
}
