// src/runner/node_exec.rs

//! Running a single node against a store: load inputs, call the node, save
//! outputs, with hook notifications around each step.
//!
//! In async mode, input loads and output saves fan out onto a bounded pool of
//! blocking I/O workers and are joined before the node is considered done, so
//! the runner's ordering and release guarantees are unaffected.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinSet;
use tracing::debug;

use crate::hooks::{Hooks, NodeContext};
use crate::io::DatasetStore;
use crate::pipeline::Node;
use crate::types::{Data, DatasetName, Inputs, Outputs};

/// Bounded pool of I/O workers used in async mode.
pub struct IoPool {
    runtime: Runtime,
    workers: usize,
}

impl IoPool {
    pub fn new(workers: usize) -> std::io::Result<Self> {
        let workers = workers.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(workers)
            .thread_name("seqpipe-io")
            .enable_all()
            .build()?;
        Ok(Self { runtime, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl fmt::Debug for IoPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoPool")
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}

/// Executes nodes, either fully on the calling thread or with pooled I/O.
#[derive(Debug, Default)]
pub struct NodeExecutor {
    pool: Option<IoPool>,
}

impl NodeExecutor {
    pub fn sequential() -> Self {
        Self { pool: None }
    }

    pub fn with_io_pool(pool: IoPool) -> Self {
        Self { pool: Some(pool) }
    }

    pub fn is_async(&self) -> bool {
        self.pool.is_some()
    }

    /// Load the node's inputs, run it, and save its outputs.
    ///
    /// Any failure in any step is returned as-is. Saves that completed before
    /// a failure are not rolled back.
    pub fn execute(
        &self,
        node: &Node,
        store: &Arc<dyn DatasetStore>,
        hooks: &Arc<dyn Hooks>,
        session_id: Option<&str>,
    ) -> Result<()> {
        match &self.pool {
            None => execute_sequential(node, store.as_ref(), hooks.as_ref(), session_id),
            Some(pool) => execute_async(pool, node, store, hooks, session_id),
        }
    }
}

fn execute_sequential(
    node: &Node,
    store: &dyn DatasetStore,
    hooks: &dyn Hooks,
    session_id: Option<&str>,
) -> Result<()> {
    let mut inputs = Inputs::new();
    for name in node.inputs() {
        let data = load_with_hooks(node, name, store, hooks)?;
        inputs.insert(name.clone(), data);
    }

    let ctx = NodeContext {
        node,
        is_async: false,
        session_id,
    };
    let outputs = call_node(&ctx, inputs, hooks)?;

    for (name, data) in in_declared_order(node, outputs) {
        hooks.before_dataset_saved(&name, &data, node)?;
        store.save(&name, data.clone())?;
        hooks.after_dataset_saved(&name, &data, node)?;
    }

    Ok(())
}

fn execute_async(
    pool: &IoPool,
    node: &Node,
    store: &Arc<dyn DatasetStore>,
    hooks: &Arc<dyn Hooks>,
    session_id: Option<&str>,
) -> Result<()> {
    let inputs = pool.runtime.block_on(load_all(node, store, hooks))?;

    let ctx = NodeContext {
        node,
        is_async: true,
        session_id,
    };
    let outputs = call_node(&ctx, inputs, hooks.as_ref())?;

    pool.runtime.block_on(save_all(node, outputs, store, hooks))
}

/// Fan out one load per input and wait for all of them. If several fail, the
/// error of the first input in declaration order is returned.
async fn load_all(
    node: &Node,
    store: &Arc<dyn DatasetStore>,
    hooks: &Arc<dyn Hooks>,
) -> Result<Inputs> {
    let mut set = JoinSet::new();
    for name in node.inputs() {
        let (node, store, hooks, name) = (
            node.clone(),
            Arc::clone(store),
            Arc::clone(hooks),
            name.clone(),
        );
        set.spawn_blocking(move || {
            let result = load_with_hooks(&node, &name, store.as_ref(), hooks.as_ref());
            (name, result)
        });
    }

    let mut results: HashMap<DatasetName, Result<Data>> = HashMap::new();
    while let Some(joined) = set.join_next().await {
        let (name, result) = joined.map_err(|e| anyhow!("dataset load task failed: {e}"))?;
        results.insert(name, result);
    }

    let mut inputs = Inputs::new();
    for name in node.inputs() {
        let data = results
            .remove(name)
            .ok_or_else(|| anyhow!("no load result for dataset '{name}'"))??;
        inputs.insert(name.clone(), data);
    }
    debug!(node = %node.name(), loaded = inputs.len(), "async input loads joined");
    Ok(inputs)
}

/// Fan out one save per output and wait for all of them. `after_dataset_saved`
/// fires per save as it completes; the first failed save in completion order
/// is returned once every save has resolved.
///
/// A failing `before_dataset_saved` stops further saves from being spawned,
/// but saves already in flight still run to completion, and its error is the
/// one returned.
async fn save_all(
    node: &Node,
    outputs: Outputs,
    store: &Arc<dyn DatasetStore>,
    hooks: &Arc<dyn Hooks>,
) -> Result<()> {
    let mut set = JoinSet::new();
    let mut first_error: Option<anyhow::Error> = None;

    for (name, data) in in_declared_order(node, outputs) {
        if let Err(e) = hooks.before_dataset_saved(&name, &data, node) {
            debug!(node = %node.name(), dataset = %name, in_flight = set.len(), "save vetoed by hook");
            first_error = Some(e);
            break;
        }
        let store = Arc::clone(store);
        set.spawn_blocking(move || {
            let result = store.save(&name, data.clone());
            (name, data, result)
        });
    }

    while let Some(joined) = set.join_next().await {
        let outcome = match joined {
            Ok((name, data, Ok(()))) => hooks.after_dataset_saved(&name, &data, node),
            Ok((_, _, Err(e))) => Err(e.into()),
            Err(e) => Err(anyhow!("dataset save task failed: {e}")),
        };
        if let Err(e) = outcome {
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn load_with_hooks(
    node: &Node,
    name: &str,
    store: &dyn DatasetStore,
    hooks: &dyn Hooks,
) -> Result<Data> {
    hooks.before_dataset_loaded(name, node)?;
    let data = store.load(name)?;
    hooks.after_dataset_loaded(name, &data, node)?;
    Ok(data)
}

/// Apply `before_node_run` overrides, call the node, and notify hooks of the
/// outcome.
fn call_node(ctx: &NodeContext<'_>, mut inputs: Inputs, hooks: &dyn Hooks) -> Result<Outputs> {
    if let Some(extra) = hooks.before_node_run(ctx, &inputs)? {
        inputs.extend(extra);
    }

    match ctx.node.run(&inputs) {
        Ok(outputs) => {
            hooks.after_node_run(ctx, &inputs, &outputs)?;
            Ok(outputs)
        }
        Err(error) => {
            hooks.on_node_error(ctx, &error, &inputs);
            Err(error)
        }
    }
}

/// `Node::run` guarantees the key sets match; this only fixes the order.
fn in_declared_order(node: &Node, mut outputs: Outputs) -> Vec<(DatasetName, Data)> {
    node.outputs()
        .iter()
        .filter_map(|name| outputs.remove_entry(name))
        .collect()
}
