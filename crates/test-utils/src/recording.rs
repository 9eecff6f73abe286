use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use seqpipe::errors::DatasetError;
use seqpipe::hooks::{Hooks, NodeContext};
use seqpipe::io::{DataCatalog, DatasetStore};
use seqpipe::pipeline::{Node, Pipeline};
use seqpipe::runner::{FailureReporter, ResumeAdvisor, ResumeSuggestion};
use seqpipe::types::{Data, DefaultDataset, Inputs, NodeName, Outputs};

/// One call observed by a [`RecordingStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Load(String),
    Save(String),
    Release(String),
}

/// An in-memory store that records every load, save and release.
///
/// Unknown names are materialised as memory datasets on first use. Names
/// passed to [`RecordingStore::persist`] report as persisted.
pub struct RecordingStore {
    inner: DataCatalog,
    persisted: Mutex<HashSet<String>>,
    events: Mutex<Vec<StoreEvent>>,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: DataCatalog::new().with_default(DefaultDataset::Memory),
            persisted: Mutex::new(HashSet::new()),
            events: Mutex::new(Vec::new()),
        })
    }

    /// Pre-populate `name` without recording a save.
    pub fn seed(&self, name: &str, data: Data) {
        self.inner.save(name, data).expect("seeding memory dataset");
    }

    pub fn persist(&self, name: &str) {
        self.persisted.lock().unwrap().insert(name.to_string());
    }

    pub fn events(&self) -> Vec<StoreEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Released names, in release order.
    pub fn releases(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                StoreEvent::Release(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn saves(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                StoreEvent::Save(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Whether a value is currently held for `name`.
    pub fn holds(&self, name: &str) -> bool {
        self.inner.load(name).is_ok()
    }

    fn record(&self, event: StoreEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl DatasetStore for RecordingStore {
    fn load(&self, name: &str) -> Result<Data, DatasetError> {
        self.record(StoreEvent::Load(name.to_string()));
        self.inner.load(name)
    }

    fn save(&self, name: &str, data: Data) -> Result<(), DatasetError> {
        self.record(StoreEvent::Save(name.to_string()));
        self.inner.save(name, data)
    }

    fn release(&self, name: &str) {
        self.record(StoreEvent::Release(name.to_string()));
        self.inner.release(name);
    }

    fn exists(&self, name: &str) -> Result<bool, DatasetError> {
        self.inner.exists(name)
    }

    fn is_persisted(&self, name: &str) -> bool {
        self.persisted.lock().unwrap().contains(name)
    }
}

/// Records each failure report, then delegates to [`ResumeAdvisor`].
#[derive(Default)]
pub struct RecordingReporter {
    calls: Mutex<Vec<Vec<NodeName>>>,
}

impl RecordingReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The done-node lists passed to each call.
    pub fn calls(&self) -> Vec<Vec<NodeName>> {
        self.calls.lock().unwrap().clone()
    }
}

impl FailureReporter for RecordingReporter {
    fn suggest_resume(
        &self,
        pipeline: &Pipeline,
        done_nodes: &[NodeName],
        store: &dyn DatasetStore,
    ) -> ResumeSuggestion {
        self.calls.lock().unwrap().push(done_nodes.to_vec());
        ResumeAdvisor.suggest_resume(pipeline, done_nodes, store)
    }
}

/// Records every hook call as `"<hook>:<subject>"`.
#[derive(Default)]
pub struct RecordingHooks {
    events: Mutex<Vec<String>>,
    extra_inputs: Option<Inputs>,
}

impl RecordingHooks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Hooks whose `before_node_run` returns `extra` for every node.
    pub fn overriding(extra: Inputs) -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            extra_inputs: Some(extra),
        })
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl Hooks for RecordingHooks {
    fn before_dataset_loaded(&self, dataset: &str, _node: &Node) -> anyhow::Result<()> {
        self.record(format!("before_load:{dataset}"));
        Ok(())
    }

    fn after_dataset_loaded(&self, dataset: &str, _data: &Data, _node: &Node) -> anyhow::Result<()> {
        self.record(format!("after_load:{dataset}"));
        Ok(())
    }

    fn before_node_run(
        &self,
        ctx: &NodeContext<'_>,
        _inputs: &Inputs,
    ) -> anyhow::Result<Option<Inputs>> {
        self.record(format!("before_run:{}", ctx.node.name()));
        Ok(self.extra_inputs.clone())
    }

    fn after_node_run(
        &self,
        ctx: &NodeContext<'_>,
        _inputs: &Inputs,
        _outputs: &Outputs,
    ) -> anyhow::Result<()> {
        self.record(format!("after_run:{}", ctx.node.name()));
        Ok(())
    }

    fn on_node_error(&self, ctx: &NodeContext<'_>, _error: &anyhow::Error, _inputs: &Inputs) {
        self.record(format!("error:{}", ctx.node.name()));
    }

    fn before_dataset_saved(&self, dataset: &str, _data: &Data, _node: &Node) -> anyhow::Result<()> {
        self.record(format!("before_save:{dataset}"));
        Ok(())
    }

    fn after_dataset_saved(&self, dataset: &str, _data: &Data, _node: &Node) -> anyhow::Result<()> {
        self.record(format!("after_save:{dataset}"));
        Ok(())
    }
}
