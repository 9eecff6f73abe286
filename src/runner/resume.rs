// src/runner/resume.rs

//! Resume suggestions after a failed run.
//!
//! Given the nodes that completed before a failure, work out the smallest set
//! of nodes a new run has to start from. Completed nodes whose outputs were
//! only held in memory are lost with the process, so the walk climbs back up
//! to the producers of any non-persisted input.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use crate::io::DatasetStore;
use crate::pipeline::{Node, Pipeline};
use crate::types::{DatasetName, NodeName};

/// Inputs with this prefix are configuration values, always available.
const PARAMS_PREFIX: &str = "params:";

/// Operator-facing advice on how to resume a failed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeSuggestion {
    /// The failure happened before any node completed.
    NothingRan,
    /// Rerun starting from `start_nodes` (sorted by name).
    FromNodes {
        remaining: usize,
        start_nodes: Vec<NodeName>,
    },
}

impl ResumeSuggestion {
    /// The CLI argument to add to the previous command, if any.
    pub fn cli_argument(&self) -> Option<String> {
        match self {
            ResumeSuggestion::NothingRan => None,
            ResumeSuggestion::FromNodes { start_nodes, .. } => {
                Some(format!("--from-nodes \"{}\"", start_nodes.join(",")))
            }
        }
    }
}

impl fmt::Display for ResumeSuggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResumeSuggestion::NothingRan => {
                write!(f, "No nodes ran. Repeat the previous command to attempt a new run.")
            }
            ResumeSuggestion::FromNodes { remaining, .. } => write!(
                f,
                "There are {remaining} nodes that have not run.\n\
                 You can resume the pipeline run from the nearest nodes with persisted \
                 inputs by adding the following argument to your previous command:\n  {}",
                self.cli_argument().unwrap_or_default()
            ),
        }
    }
}

/// Produces the resume diagnostic for a failed run. Must not fail.
pub trait FailureReporter: Send + Sync {
    fn suggest_resume(
        &self,
        pipeline: &Pipeline,
        done_nodes: &[NodeName],
        store: &dyn DatasetStore,
    ) -> ResumeSuggestion;
}

/// Default reporter: delegates to [`suggest_resume`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ResumeAdvisor;

impl FailureReporter for ResumeAdvisor {
    fn suggest_resume(
        &self,
        pipeline: &Pipeline,
        done_nodes: &[NodeName],
        store: &dyn DatasetStore,
    ) -> ResumeSuggestion {
        suggest_resume(pipeline, done_nodes, store)
    }
}

/// Compute where a new run should start after `done_nodes` completed.
pub fn suggest_resume(
    pipeline: &Pipeline,
    done_nodes: &[NodeName],
    store: &dyn DatasetStore,
) -> ResumeSuggestion {
    if done_nodes.is_empty() {
        return ResumeSuggestion::NothingRan;
    }

    let done: HashSet<&str> = done_nodes.iter().map(String::as_str).collect();
    let unfinished: Vec<&str> = pipeline.node_names().filter(|n| !done.contains(n)).collect();

    let to_run = nodes_for_resumed_pipeline(pipeline, &unfinished, store);
    // Names all come from `pipeline`, so the lookup cannot miss.
    let sub = pipeline.only_nodes(&to_run).unwrap_or_default();

    let mut start_nodes: Vec<NodeName> = sub
        .initial_group()
        .iter()
        .map(|n| n.name().to_string())
        .collect();
    start_nodes.sort();

    ResumeSuggestion::FromNodes {
        remaining: unfinished.len(),
        start_nodes,
    }
}

/// Breadth-first walk from the unfinished nodes that read external inputs,
/// up through producers of non-persisted inputs, then closed over everything
/// downstream.
fn nodes_for_resumed_pipeline(
    pipeline: &Pipeline,
    unfinished: &[&str],
    store: &dyn DatasetStore,
) -> Vec<NodeName> {
    let unfinished_pipeline = pipeline.only_nodes(unfinished).unwrap_or_default();
    let external: Vec<DatasetName> = unfinished_pipeline.inputs().into_iter().collect();
    let initial = unfinished_pipeline.only_nodes_with_inputs(&external);

    let mut to_run: HashSet<NodeName> = unfinished.iter().map(|n| n.to_string()).collect();
    let mut visited: HashSet<NodeName> = initial.node_names().map(str::to_string).collect();
    let mut queue: VecDeque<Node> = initial.nodes().iter().cloned().collect();

    while let Some(current) = queue.pop_front() {
        to_run.insert(current.name().to_string());

        let missing = non_persisted_inputs(&current, store);
        for producer in pipeline.only_nodes_with_outputs(&missing).nodes() {
            if visited.insert(producer.name().to_string()) {
                queue.push_back(producer.clone());
            }
        }
    }

    let to_run: Vec<NodeName> = to_run.into_iter().collect();
    pipeline
        .from_nodes(&to_run)
        .map(|p| p.node_names().map(str::to_string).collect())
        .unwrap_or_default()
}

fn non_persisted_inputs(node: &Node, store: &dyn DatasetStore) -> Vec<DatasetName> {
    node.inputs()
        .iter()
        .filter(|input| !input.starts_with(PARAMS_PREFIX) && !store.is_persisted(input))
        .cloned()
        .collect()
}
