// src/runner/mod.rs

//! Pipeline execution.
//!
//! - [`liveness`] counts remaining reads per dataset and decides releases.
//! - [`node_exec`] runs one node: load, call, save, with hooks around each.
//! - [`resume`] turns a failure into advice on where to restart.
//! - [`sequential`] holds [`SequentialRunner`], the loop tying these together.

pub mod liveness;
pub mod node_exec;
pub mod resume;
pub mod sequential;

use std::fmt;

use serde::Deserialize;

pub use liveness::{Boundary, LoadCounts};
pub use node_exec::{IoPool, NodeExecutor};
pub use resume::{FailureReporter, ResumeAdvisor, ResumeSuggestion, suggest_resume};
pub use sequential::SequentialRunner;

use crate::types::{DatasetName, DefaultDataset, NodeName};

/// Runner configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerOptions {
    /// Overlap each node's input loads and output saves on I/O workers.
    pub is_async: bool,
    /// Size of the I/O worker pool in async mode.
    pub io_workers: usize,
    /// Resolution for dataset names the catalog has no entry for.
    pub default_dataset: DefaultDataset,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            is_async: false,
            io_workers: 4,
            default_dataset: DefaultDataset::Memory,
        }
    }
}

/// What a successful run did, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub executed: Vec<NodeName>,
    pub released: Vec<DatasetName>,
}

/// A run aborted by a node failure.
///
/// Displays as the node's original error; [`RunFailure::into_error`] hands
/// that error back unchanged.
#[derive(Debug)]
pub struct RunFailure {
    pub node: NodeName,
    pub done_nodes: Vec<NodeName>,
    pub suggestion: ResumeSuggestion,
    error: anyhow::Error,
}

impl RunFailure {
    pub fn new(
        node: impl Into<NodeName>,
        done_nodes: Vec<NodeName>,
        suggestion: ResumeSuggestion,
        error: anyhow::Error,
    ) -> Self {
        Self {
            node: node.into(),
            done_nodes,
            suggestion,
            error,
        }
    }

    pub fn error(&self) -> &anyhow::Error {
        &self.error
    }

    pub fn into_error(self) -> anyhow::Error {
        self.error
    }
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl std::error::Error for RunFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.error.source()
    }
}
