// src/logging.rs

//! Logging for `seqpipe`.
//!
//! stdout is reserved for the JSON object of returned pipeline outputs, so
//! `seqpipe | jq` keeps working; every log line goes to stderr. At `info` a
//! run shows one "Completed i out of n tasks" line per node, and a failed run
//! ends with the `--from-nodes` resume advice at `warn`. The stderr of command
//! nodes is only logged at `debug` under `seqpipe::exec`.
//!
//! The filter comes from `--log-level`, else from `SEQPIPE_LOG`, else `info`.
//! `SEQPIPE_LOG` takes either a bare level or full `EnvFilter` directives,
//! e.g. `SEQPIPE_LOG=info,seqpipe::exec=debug` to see command stderr without
//! the dataset-level chatter.

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

const LOG_ENV: &str = "SEQPIPE_LOG";

/// Install the global subscriber. Fails if one is already installed or if
/// `SEQPIPE_LOG` does not parse as a filter.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let directives = filter_directives(cli_level, env.as_deref());
    let filter = EnvFilter::try_new(&directives)
        .with_context(|| format!("invalid {LOG_ENV} filter '{directives}'"))?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(())
}

fn filter_directives(cli_level: Option<LogLevel>, env: Option<&str>) -> String {
    if let Some(lvl) = cli_level {
        return level_name(lvl).to_string();
    }
    match env.map(str::trim) {
        Some(s) if !s.is_empty() => parse_level_str(s).unwrap_or(s).to_string(),
        _ => "info".to_string(),
    }
}

fn level_name(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

/// Bare levels, accepting `warning` as well.
fn parse_level_str(s: &str) -> Option<&'static str> {
    match s.to_lowercase().as_str() {
        "error" => Some("error"),
        "warn" | "warning" => Some("warn"),
        "info" => Some("info"),
        "debug" => Some("debug"),
        "trace" => Some("trace"),
        _ => None,
    }
}
