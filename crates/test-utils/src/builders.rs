#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use serde_json::json;
use seqpipe::pipeline::{Node, Pipeline};
use seqpipe::types::{Inputs, Outputs};

/// Builder for `Pipeline` to simplify test setup.
///
/// Every node built here appends its name to a shared log when it runs and
/// writes `{"by": <node>, "inputs": <n>}` to each of its outputs.
pub struct PipelineBuilder {
    nodes: Vec<Node>,
    executed: Arc<Mutex<Vec<String>>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            executed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn node(mut self, name: &str, inputs: &[&str], outputs: &[&str]) -> Self {
        let log = Arc::clone(&self.executed);
        let node_name = name.to_string();
        let declared: Vec<String> = outputs.iter().map(|s| s.to_string()).collect();
        let func = move |inputs: &Inputs| -> anyhow::Result<Outputs> {
            log.lock().unwrap().push(node_name.clone());
            Ok(declared
                .iter()
                .map(|o| (o.clone(), json!({ "by": node_name, "inputs": inputs.len() })))
                .collect())
        };
        self.nodes.push(
            Node::new(name, inputs.iter().copied(), outputs.iter().copied(), func)
                .expect("invalid test node"),
        );
        self
    }

    /// A node whose function fails with `message`.
    pub fn failing(mut self, name: &str, inputs: &[&str], outputs: &[&str], message: &str) -> Self {
        let log = Arc::clone(&self.executed);
        let node_name = name.to_string();
        let message = message.to_string();
        let func = move |_: &Inputs| -> anyhow::Result<Outputs> {
            log.lock().unwrap().push(node_name.clone());
            Err(anyhow::anyhow!(message.clone()))
        };
        self.nodes.push(
            Node::new(name, inputs.iter().copied(), outputs.iter().copied(), func)
                .expect("invalid test node"),
        );
        self
    }

    /// Add an arbitrary node.
    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// Shared log of executed node names, in execution order.
    pub fn executed(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.executed)
    }

    pub fn build(self) -> Pipeline {
        Pipeline::new(self.nodes).expect("Failed to build valid pipeline from builder")
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
