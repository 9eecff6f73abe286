// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::DefaultDataset;

/// Command-line arguments for `seqpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "seqpipe",
    version,
    about = "Run a pipeline of commands in order, freeing intermediate data as soon as it is no longer needed.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the pipeline file (TOML).
    ///
    /// Default: `Seqpipe.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Seqpipe.toml")]
    pub config: String,

    /// Load node inputs and save node outputs on a pool of I/O workers.
    ///
    /// Overrides `[runner].is_async` when given.
    #[arg(long = "async")]
    pub is_async: bool,

    /// Run only these nodes and everything downstream of them
    /// (comma-separated).
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub from_nodes: Vec<String>,

    /// Skip nodes whose outputs already exist in the catalog, unless a
    /// missing result downstream needs them.
    #[arg(long)]
    pub only_missing: bool,

    /// Dataset resolution for names without a `[dataset.<name>]` section:
    /// `memory` or `json:<dir>`.
    ///
    /// Overrides `[runner].default_dataset` when given.
    #[arg(long, value_name = "KIND")]
    pub default_dataset: Option<DefaultDataset>,

    /// Opaque id forwarded to hooks.
    #[arg(long, value_name = "ID")]
    pub session_id: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SEQPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the execution plan, but don't run any node.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
