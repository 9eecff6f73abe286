// src/runner/sequential.rs

//! The reference-counted sequential runner.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::errors::{Result, SeqpipeError};
use crate::hooks::{HookManager, Hooks};
use crate::io::{DataCatalog, DatasetStore};
use crate::pipeline::Pipeline;
use crate::runner::liveness::{Boundary, LoadCounts};
use crate::runner::node_exec::{IoPool, NodeExecutor};
use crate::runner::resume::{FailureReporter, ResumeAdvisor};
use crate::runner::{RunFailure, RunSummary, RunnerOptions};
use crate::types::{Data, DatasetName, NodeName};

/// Runs a pipeline's nodes one after another, in pipeline order, releasing
/// every intermediate dataset as soon as no later node reads it.
///
/// The runner holds no per-run state; one instance may run several pipelines,
/// including concurrently from different threads against different stores.
pub struct SequentialRunner {
    options: RunnerOptions,
    executor: NodeExecutor,
    reporter: Arc<dyn FailureReporter>,
}

impl std::fmt::Debug for SequentialRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequentialRunner")
            .field("options", &self.options)
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

impl SequentialRunner {
    /// Create a runner. In async mode this starts the I/O worker pool.
    pub fn new(options: RunnerOptions) -> Result<Self> {
        let executor = if options.is_async {
            NodeExecutor::with_io_pool(IoPool::new(options.io_workers)?)
        } else {
            NodeExecutor::sequential()
        };

        Ok(Self {
            options,
            executor,
            reporter: Arc::new(ResumeAdvisor),
        })
    }

    /// Replace the failure reporter (defaults to [`ResumeAdvisor`]).
    pub fn with_reporter(mut self, reporter: Arc<dyn FailureReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    pub fn is_async(&self) -> bool {
        self.executor.is_async()
    }

    /// Run `pipeline` against `catalog` and return the values of the free
    /// outputs the catalog does not persist.
    ///
    /// The catalog is shallow-copied first; the runner's default dataset
    /// resolution applies to the copy unless `catalog` has its own. A free
    /// input is satisfied when it is registered, or when a file-backed
    /// default already has its file on disk.
    pub fn run(
        &self,
        pipeline: &Pipeline,
        catalog: &DataCatalog,
        hooks: Option<Arc<dyn Hooks>>,
        session_id: Option<&str>,
    ) -> Result<BTreeMap<DatasetName, Data>> {
        let hooks: Arc<dyn Hooks> = match hooks {
            Some(hooks) => hooks,
            None => Arc::new(HookManager::new()),
        };

        let returned: Vec<DatasetName> = pipeline
            .outputs()
            .into_iter()
            .filter(|d| !catalog.is_registered(d) || !catalog.is_persisted(d))
            .collect();

        let catalog = Arc::new(catalog.shallow_copy_with_default(&self.options.default_dataset));

        let unsatisfied: Vec<DatasetName> = pipeline
            .inputs()
            .into_iter()
            .filter(|d| !catalog.is_satisfiable(d))
            .collect();
        if !unsatisfied.is_empty() {
            return Err(SeqpipeError::UnsatisfiedInputs(unsatisfied));
        }

        let store: Arc<dyn DatasetStore> = catalog.clone();

        if self.is_async() {
            info!("Asynchronous mode is enabled for loading and saving data");
        } else {
            info!(
                "Using synchronous mode for loading and saving data. Use the --async flag \
                 for potential performance gains."
            );
        }
        self.run_sequential(pipeline, store, hooks, session_id)?;
        info!("Pipeline execution completed successfully.");

        let mut values = BTreeMap::new();
        for name in returned {
            let data = catalog.load(&name)?;
            values.insert(name, data);
        }
        Ok(values)
    }

    /// Run only the part of `pipeline` whose results are missing.
    ///
    /// Selected are the producers of free outputs the catalog does not
    /// register and of registered datasets that do not exist yet, everything
    /// downstream of those, and the chain of producers behind any
    /// unregistered dataset the selection reads. The selection then goes
    /// through [`SequentialRunner::run`].
    pub fn run_only_missing(
        &self,
        pipeline: &Pipeline,
        catalog: &DataCatalog,
        hooks: Option<Arc<dyn Hooks>>,
        session_id: Option<&str>,
    ) -> Result<BTreeMap<DatasetName, Data>> {
        let registered: BTreeSet<DatasetName> = catalog.list(None)?.into_iter().collect();

        let mut to_build: Vec<DatasetName> = pipeline
            .outputs()
            .into_iter()
            .filter(|d| !registered.contains(d))
            .collect();
        for name in &registered {
            if !catalog.exists(name)? {
                to_build.push(name.clone());
            }
        }

        let producers = pipeline.only_nodes_with_outputs(&to_build);
        let downstream = pipeline.from_inputs(&to_build);
        let to_rerun = pipeline.union_of(&[&producers, &downstream]);

        let unregistered: Vec<DatasetName> = pipeline
            .datasets()
            .into_iter()
            .filter(|d| !registered.contains(d))
            .collect();
        let reads_unregistered: Vec<DatasetName> = to_rerun
            .inputs()
            .into_iter()
            .filter(|d| !registered.contains(d))
            .collect();
        let upstream = pipeline
            .only_nodes_with_outputs(&unregistered)
            .to_outputs(&reads_unregistered);
        let to_rerun = pipeline.union_of(&[&to_rerun, &upstream]);

        debug!(
            missing = ?to_build,
            selected = to_rerun.len(),
            total = pipeline.len(),
            "running only missing outputs"
        );
        self.run(&to_rerun, catalog, hooks, session_id)
    }

    /// The execution loop.
    ///
    /// Runs every node in order. After each node, consumed inputs whose
    /// reads are exhausted and produced outputs nobody reads any more are
    /// released, except for the pipeline's free inputs and free outputs.
    ///
    /// On the first node failure, the failure reporter is consulted exactly
    /// once and the returned [`RunFailure`] carries the node's original error.
    pub fn run_sequential(
        &self,
        pipeline: &Pipeline,
        store: Arc<dyn DatasetStore>,
        hooks: Arc<dyn Hooks>,
        session_id: Option<&str>,
    ) -> std::result::Result<RunSummary, RunFailure> {
        let total = pipeline.len();
        let boundary = Boundary::of(pipeline);
        let mut counts = LoadCounts::from_pipeline(pipeline);
        let mut done: Vec<NodeName> = Vec::with_capacity(total);
        let mut released: Vec<DatasetName> = Vec::new();

        for (index, node) in pipeline.nodes().iter().enumerate() {
            debug!(node = %node.name(), index, "running node");

            if let Err(err) = self.executor.execute(node, &store, &hooks, session_id) {
                error!(node = %node.name(), error = %err, "node failed");
                let suggestion = self.reporter.suggest_resume(pipeline, &done, store.as_ref());
                warn!("{suggestion}");
                return Err(RunFailure::new(node.name(), done, suggestion, err));
            }
            done.push(node.name().to_string());

            for dataset in counts.complete(node, &boundary) {
                store.release(&dataset);
                released.push(dataset);
            }

            info!("Completed {} out of {} tasks", index + 1, total);
        }

        Ok(RunSummary {
            executed: done,
            released,
        })
    }
}
