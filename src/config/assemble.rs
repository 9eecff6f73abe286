// src/config/assemble.rs

//! Turning a validated [`ConfigFile`] into runnable pieces.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::model::{ConfigFile, DatasetConfig};
use crate::errors::Result;
use crate::exec::{CommandSpec, command_node};
use crate::io::{DataCatalog, Dataset, JsonDataset, MemoryDataset};
use crate::pipeline::Pipeline;
use crate::runner::RunnerOptions;
use crate::types::DefaultDataset;

/// A pipeline file, ready to hand to the runner.
#[derive(Debug)]
pub struct Project {
    pub pipeline: Pipeline,
    pub catalog: DataCatalog,
    pub options: RunnerOptions,
}

impl ConfigFile {
    /// Build the pipeline, catalog and runner options.
    ///
    /// Relative file paths are resolved against `root`.
    pub fn assemble(&self, root: &Path) -> Result<Project> {
        let mut nodes = Vec::with_capacity(self.order.len());
        for (name, node) in self.ordered_nodes() {
            let spec = CommandSpec {
                node: name.clone(),
                cmd: node.cmd.clone(),
                timeout: node.timeout_secs.map(Duration::from_secs),
            };
            nodes.push(command_node(spec, node.inputs.clone(), node.outputs.clone())?);
        }
        let pipeline = Pipeline::new(nodes)?;

        let catalog = DataCatalog::new();
        for (name, dataset) in self.dataset.iter() {
            let dataset: Arc<dyn Dataset> = match dataset {
                DatasetConfig::Memory { data: Some(data) } => {
                    Arc::new(MemoryDataset::with_data(data.clone()))
                }
                DatasetConfig::Memory { data: None } => Arc::new(MemoryDataset::new()),
                DatasetConfig::Json { path } => Arc::new(JsonDataset::new(root.join(path))),
            };
            debug!(dataset = %name, ?dataset, "registering dataset");
            catalog.add(name.clone(), dataset, false)?;
        }

        let mut options = self.runner.clone();
        if let DefaultDataset::Json { dir } = &options.default_dataset {
            options.default_dataset = DefaultDataset::Json {
                dir: root.join(dir),
            };
        }

        Ok(Project {
            pipeline,
            catalog,
            options,
        })
    }
}
