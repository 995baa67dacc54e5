//! Command-line front end for Strata.
//!
//! # Key Abstractions
//!
//! - [`CliArgs`]: the parsed command line
//! - [`StrataConfig`]: file and environment configuration, embedding the engine tunables
//! - [`StrataCli`]: logging setup and command dispatch

#![doc = include_str!("../README.md")]

pub mod app;
pub mod cli;
pub mod config;
pub mod config_handlers;
pub mod find_handlers;
pub mod graph_handlers;
pub mod inputs;

pub use app::StrataCli;
pub use cli::CliArgs;
pub use config::StrataConfig;
