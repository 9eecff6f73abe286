// src/runner/liveness.rs

//! Per-run dataset liveness counting.
//!
//! A [`LoadCounts`] value is created at the start of one run, mutated only by
//! that run's loop, and dropped when the run returns. There is no shared or
//! global counter state, so independent runs never interfere.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::trace;

use crate::pipeline::{Node, Pipeline};
use crate::types::DatasetName;

/// The pipeline's external contract: datasets the caller owns before and
/// after the run. Never released by the runner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Boundary {
    pub free_inputs: BTreeSet<DatasetName>,
    pub free_outputs: BTreeSet<DatasetName>,
}

impl Boundary {
    pub fn of(pipeline: &Pipeline) -> Self {
        Self {
            free_inputs: pipeline.inputs(),
            free_outputs: pipeline.outputs(),
        }
    }

    pub fn contains(&self, dataset: &str) -> bool {
        self.free_inputs.contains(dataset) || self.free_outputs.contains(dataset)
    }
}

/// Remaining number of future reads per dataset.
#[derive(Debug, Clone, Default)]
pub struct LoadCounts {
    counts: HashMap<DatasetName, usize>,
    released: HashSet<DatasetName>,
}

impl LoadCounts {
    /// Count every appearance of a dataset across all node inputs. A dataset
    /// read by three nodes starts at 3.
    pub fn from_pipeline(pipeline: &Pipeline) -> Self {
        let mut counts: HashMap<DatasetName, usize> = HashMap::new();
        for input in pipeline.nodes().iter().flat_map(|n| n.inputs()) {
            *counts.entry(input.clone()).or_default() += 1;
        }
        Self {
            counts,
            released: HashSet::new(),
        }
    }

    /// Future reads left for `dataset`; zero for datasets nobody reads.
    pub fn remaining(&self, dataset: &str) -> usize {
        self.counts.get(dataset).copied().unwrap_or(0)
    }

    pub fn is_released(&self, dataset: &str) -> bool {
        self.released.contains(dataset)
    }

    /// Account for the successful completion of `node` and return the
    /// datasets that may now be released, in the order they should be.
    ///
    /// Inputs come first: each read is consumed, and an input with no reads
    /// left is released unless it is a free input. Then outputs: an output
    /// with no reads left is released unless it is a free output. A dataset is
    /// never returned twice over the lifetime of one `LoadCounts`.
    pub fn complete(&mut self, node: &Node, boundary: &Boundary) -> Vec<DatasetName> {
        let mut to_release = Vec::new();

        for input in node.inputs() {
            if let Some(count) = self.counts.get_mut(input) {
                *count = count.saturating_sub(1);
            }
            let left = self.remaining(input);
            trace!(node = %node.name(), dataset = %input, left, "consumed input");

            if left < 1 && !boundary.free_inputs.contains(input) && self.mark_released(input) {
                to_release.push(input.clone());
            }
        }

        for output in node.outputs() {
            if self.remaining(output) < 1
                && !boundary.free_outputs.contains(output)
                && self.mark_released(output)
            {
                to_release.push(output.clone());
            }
        }

        to_release
    }

    fn mark_released(&mut self, dataset: &str) -> bool {
        self.released.insert(dataset.to_string())
    }
}
