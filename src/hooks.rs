// src/hooks.rs

//! Observation points around node execution.
//!
//! Every method has a no-op default, so implementors only override what they
//! care about. Returning an error from a hook fails the node being executed.
//! Dataset load/save hooks may be called from I/O worker threads when the
//! runner is in async mode.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;

use crate::pipeline::Node;
use crate::types::{Data, Inputs, Outputs};

/// Per-invocation context handed to node-level hooks.
#[derive(Debug, Clone, Copy)]
pub struct NodeContext<'a> {
    pub node: &'a Node,
    pub is_async: bool,
    pub session_id: Option<&'a str>,
}

pub trait Hooks: Send + Sync {
    fn before_dataset_loaded(&self, _dataset: &str, _node: &Node) -> Result<()> {
        Ok(())
    }

    fn after_dataset_loaded(&self, _dataset: &str, _data: &Data, _node: &Node) -> Result<()> {
        Ok(())
    }

    /// May return values that replace or extend the loaded inputs.
    fn before_node_run(&self, _ctx: &NodeContext<'_>, _inputs: &Inputs) -> Result<Option<Inputs>> {
        Ok(None)
    }

    fn after_node_run(
        &self,
        _ctx: &NodeContext<'_>,
        _inputs: &Inputs,
        _outputs: &Outputs,
    ) -> Result<()> {
        Ok(())
    }

    /// Called when the node function itself fails. The node error is
    /// returned to the runner afterwards regardless.
    fn on_node_error(&self, _ctx: &NodeContext<'_>, _error: &anyhow::Error, _inputs: &Inputs) {}

    fn before_dataset_saved(&self, _dataset: &str, _data: &Data, _node: &Node) -> Result<()> {
        Ok(())
    }

    fn after_dataset_saved(&self, _dataset: &str, _data: &Data, _node: &Node) -> Result<()> {
        Ok(())
    }
}

/// Fans every hook call out to the registered hooks, in registration order.
///
/// An empty manager is the "null" hook set.
#[derive(Default, Clone)]
pub struct HookManager {
    hooks: Vec<Arc<dyn Hooks>>,
}

impl HookManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hooks: Arc<dyn Hooks>) {
        self.hooks.push(hooks);
    }

    pub fn with(mut self, hooks: Arc<dyn Hooks>) -> Self {
        self.register(hooks);
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl fmt::Debug for HookManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookManager")
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

impl Hooks for HookManager {
    fn before_dataset_loaded(&self, dataset: &str, node: &Node) -> Result<()> {
        self.hooks
            .iter()
            .try_for_each(|h| h.before_dataset_loaded(dataset, node))
    }

    fn after_dataset_loaded(&self, dataset: &str, data: &Data, node: &Node) -> Result<()> {
        self.hooks
            .iter()
            .try_for_each(|h| h.after_dataset_loaded(dataset, data, node))
    }

    fn before_node_run(&self, ctx: &NodeContext<'_>, inputs: &Inputs) -> Result<Option<Inputs>> {
        let mut additional: Option<Inputs> = None;
        for hook in &self.hooks {
            if let Some(extra) = hook.before_node_run(ctx, inputs)? {
                additional.get_or_insert_with(Inputs::new).extend(extra);
            }
        }
        Ok(additional)
    }

    fn after_node_run(&self, ctx: &NodeContext<'_>, inputs: &Inputs, outputs: &Outputs) -> Result<()> {
        self.hooks
            .iter()
            .try_for_each(|h| h.after_node_run(ctx, inputs, outputs))
    }

    fn on_node_error(&self, ctx: &NodeContext<'_>, error: &anyhow::Error, inputs: &Inputs) {
        for hook in &self.hooks {
            hook.on_node_error(ctx, error, inputs);
        }
    }

    fn before_dataset_saved(&self, dataset: &str, data: &Data, node: &Node) -> Result<()> {
        self.hooks
            .iter()
            .try_for_each(|h| h.before_dataset_saved(dataset, data, node))
    }

    fn after_dataset_saved(&self, dataset: &str, data: &Data, node: &Node) -> Result<()> {
        self.hooks
            .iter()
            .try_for_each(|h| h.after_dataset_saved(dataset, data, node))
    }
}
