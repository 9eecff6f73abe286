// src/pipeline/graph.rs

//! An ordered node sequence and its dataset boundary.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::errors::{Result, SeqpipeError};
use crate::pipeline::node::Node;
use crate::types::DatasetName;

/// A topologically ordered sequence of nodes.
///
/// The order is trusted as given: every node that produces an input of node
/// `N` must appear before `N`. [`crate::config`] produces such an order for
/// pipeline files; library callers are responsible for it otherwise.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    nodes: Vec<Node>,
}

impl Pipeline {
    /// Build a pipeline from nodes already in topological order.
    ///
    /// Fails on duplicate node names or on a dataset produced by more than one
    /// node.
    pub fn new(nodes: Vec<Node>) -> Result<Self> {
        let mut names = HashSet::new();
        let mut producers: HashMap<&str, &str> = HashMap::new();

        for node in &nodes {
            if !names.insert(node.name()) {
                return Err(SeqpipeError::InvalidPipeline(format!(
                    "node name '{}' is used more than once",
                    node.name()
                )));
            }
            for output in node.outputs() {
                if let Some(other) = producers.insert(output.as_str(), node.name()) {
                    return Err(SeqpipeError::InvalidPipeline(format!(
                        "dataset '{output}' is produced by both '{other}' and '{}'",
                        node.name()
                    )));
                }
            }
        }

        Ok(Self { nodes })
    }

    /// Subsets of a valid pipeline stay valid, so no re-checking here.
    fn subset<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&Node) -> bool,
    {
        Self {
            nodes: self.nodes.iter().filter(|n| keep(n)).cloned().collect(),
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name() == name)
    }

    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(Node::name)
    }

    fn all_inputs(&self) -> BTreeSet<DatasetName> {
        self.nodes
            .iter()
            .flat_map(|n| n.inputs().iter().cloned())
            .collect()
    }

    fn all_outputs(&self) -> BTreeSet<DatasetName> {
        self.nodes
            .iter()
            .flat_map(|n| n.outputs().iter().cloned())
            .collect()
    }

    /// Free inputs: datasets consumed but never produced inside the pipeline.
    pub fn inputs(&self) -> BTreeSet<DatasetName> {
        let outputs = self.all_outputs();
        self.all_inputs()
            .into_iter()
            .filter(|d| !outputs.contains(d))
            .collect()
    }

    /// Free outputs: datasets produced but never consumed inside the pipeline.
    pub fn outputs(&self) -> BTreeSet<DatasetName> {
        let inputs = self.all_inputs();
        self.all_outputs()
            .into_iter()
            .filter(|d| !inputs.contains(d))
            .collect()
    }

    /// Every dataset referenced by any node.
    pub fn datasets(&self) -> BTreeSet<DatasetName> {
        let mut all = self.all_inputs();
        all.extend(self.all_outputs());
        all
    }

    /// Nodes with the given names, in pipeline order.
    pub fn only_nodes<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let wanted = self.resolve_names(names)?;
        Ok(self.subset(|n| wanted.contains(n.name())))
    }

    /// Nodes producing any of the given datasets, in pipeline order.
    pub fn only_nodes_with_outputs<S: AsRef<str>>(&self, outputs: &[S]) -> Self {
        let wanted: HashSet<&str> = outputs.iter().map(AsRef::as_ref).collect();
        self.subset(|n| n.outputs().iter().any(|o| wanted.contains(o.as_str())))
    }

    /// Nodes consuming any of the given datasets, in pipeline order.
    pub fn only_nodes_with_inputs<S: AsRef<str>>(&self, inputs: &[S]) -> Self {
        let wanted: HashSet<&str> = inputs.iter().map(AsRef::as_ref).collect();
        self.subset(|n| n.inputs().iter().any(|i| wanted.contains(i.as_str())))
    }

    /// The named nodes plus everything downstream of them.
    ///
    /// A single forward pass suffices because the sequence is topological.
    pub fn from_nodes<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let start = self.resolve_names(names)?;
        let mut reached: HashSet<&str> = HashSet::new();
        let mut nodes = Vec::new();

        for node in &self.nodes {
            if start.contains(node.name())
                || node.inputs().iter().any(|i| reached.contains(i.as_str()))
            {
                reached.extend(node.outputs().iter().map(String::as_str));
                nodes.push(node.clone());
            }
        }

        Ok(Self { nodes })
    }

    /// Nodes consuming any of the given datasets plus everything downstream
    /// of them.
    pub fn from_inputs<S: AsRef<str>>(&self, inputs: &[S]) -> Self {
        let mut reached: HashSet<&str> = inputs.iter().map(AsRef::as_ref).collect();
        let mut nodes = Vec::new();

        for node in &self.nodes {
            if node.inputs().iter().any(|i| reached.contains(i.as_str())) {
                reached.extend(node.outputs().iter().map(String::as_str));
                nodes.push(node.clone());
            }
        }

        Self { nodes }
    }

    /// Nodes producing any of the given datasets plus everything upstream
    /// of them, walking the sequence backwards.
    pub fn to_outputs<S: AsRef<str>>(&self, outputs: &[S]) -> Self {
        let mut needed: HashSet<&str> = outputs.iter().map(AsRef::as_ref).collect();
        let mut keep: HashSet<&str> = HashSet::new();

        for node in self.nodes.iter().rev() {
            if node.outputs().iter().any(|o| needed.contains(o.as_str())) {
                needed.extend(node.inputs().iter().map(String::as_str));
                keep.insert(node.name());
            }
        }

        self.subset(|n| keep.contains(n.name()))
    }

    /// Nodes of this pipeline that appear in any of `parts`, in this
    /// pipeline's order. `parts` are expected to be sub-pipelines of `self`.
    pub fn union_of(&self, parts: &[&Pipeline]) -> Self {
        let names: HashSet<&str> = parts.iter().flat_map(|p| p.node_names()).collect();
        self.subset(|n| names.contains(n.name()))
    }

    /// Nodes that depend on no other node of this pipeline: the first
    /// topological group.
    pub fn initial_group(&self) -> Vec<&Node> {
        let produced = self.all_outputs();
        self.nodes
            .iter()
            .filter(|n| n.inputs().iter().all(|i| !produced.contains(i)))
            .collect()
    }

    fn resolve_names<'a, S: AsRef<str>>(&self, names: &'a [S]) -> Result<HashSet<&'a str>> {
        let wanted: HashSet<&str> = names.iter().map(AsRef::as_ref).collect();
        let mut missing: Vec<&str> = wanted
            .iter()
            .copied()
            .filter(|name| self.node(name).is_none())
            .collect();

        if !missing.is_empty() {
            missing.sort_unstable();
            return Err(SeqpipeError::InvalidPipeline(format!(
                "pipeline does not contain nodes named {missing:?}"
            )));
        }

        Ok(wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Inputs, Outputs};

    fn noop(_: &Inputs) -> anyhow::Result<Outputs> {
        Ok(Outputs::new())
    }

    fn node(name: &str, inputs: &[&str], outputs: &[&str]) -> Node {
        Node::new(
            name,
            inputs.iter().copied(),
            outputs.iter().copied(),
            noop,
        )
        .unwrap()
    }

    /// raw -> clean -> features -> model
    ///            \-> report
    fn sample() -> Pipeline {
        Pipeline::new(vec![
            node("clean", &["raw"], &["cleaned"]),
            node("featurize", &["cleaned", "params:k"], &["features"]),
            node("report", &["cleaned"], &["summary"]),
            node("train", &["features"], &["model"]),
        ])
        .unwrap()
    }

    #[test]
    fn boundary_sets() {
        let p = sample();
        let inputs: Vec<_> = p.inputs().into_iter().collect();
        let outputs: Vec<_> = p.outputs().into_iter().collect();
        assert_eq!(inputs, vec!["params:k", "raw"]);
        assert_eq!(outputs, vec!["model", "summary"]);
    }

    #[test]
    fn rejects_duplicate_producers() {
        let err = Pipeline::new(vec![node("a", &[], &["x"]), node("b", &[], &["x"])]).unwrap_err();
        assert!(matches!(err, SeqpipeError::InvalidPipeline(msg) if msg.contains("'x'")));
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = Pipeline::new(vec![node("a", &[], &["x"]), node("a", &[], &["y"])]).unwrap_err();
        assert!(matches!(err, SeqpipeError::InvalidPipeline(_)));
    }

    #[test]
    fn from_nodes_follows_downstream() {
        let p = sample();
        let sub = p.from_nodes(&["featurize"]).unwrap();
        let names: Vec<_> = sub.node_names().collect();
        assert_eq!(names, vec!["featurize", "train"]);
    }

    #[test]
    fn from_nodes_unknown_name() {
        let err = sample().from_nodes(&["nope"]).unwrap_err();
        assert!(matches!(err, SeqpipeError::InvalidPipeline(msg) if msg.contains("nope")));
    }

    #[test]
    fn from_inputs_follows_downstream_of_consumers() {
        let sub = sample().from_inputs(&["cleaned"]);
        let names: Vec<_> = sub.node_names().collect();
        assert_eq!(names, vec!["featurize", "report", "train"]);

        assert!(sample().from_inputs(&["model"]).is_empty());
    }

    #[test]
    fn to_outputs_follows_upstream_of_producers() {
        let sub = sample().to_outputs(&["features"]);
        let names: Vec<_> = sub.node_names().collect();
        assert_eq!(names, vec!["clean", "featurize"]);

        let sub = sample().to_outputs(&["summary"]);
        let names: Vec<_> = sub.node_names().collect();
        assert_eq!(names, vec!["clean", "report"]);
    }

    #[test]
    fn union_keeps_pipeline_order() {
        let p = sample();
        let late = p.only_nodes(&["train"]).unwrap();
        let early = p.only_nodes(&["clean", "train"]).unwrap();
        let merged = p.union_of(&[&late, &early]);
        let names: Vec<_> = merged.node_names().collect();
        assert_eq!(names, vec!["clean", "train"]);
    }

    #[test]
    fn initial_group_of_subset() {
        let p = sample();
        let sub = p.only_nodes(&["report", "train", "featurize"]).unwrap();
        let names: Vec<_> = sub.initial_group().iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["featurize", "report"]);
    }
}
