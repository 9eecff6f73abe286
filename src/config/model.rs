// src/config/model.rs

//! Data model of a `Seqpipe.toml` pipeline file.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::runner::RunnerOptions;
use crate::types::{Data, DatasetName, NodeName};

/// The file as deserialized, before any semantic checks.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub runner: RunnerOptions,

    #[serde(default)]
    pub dataset: BTreeMap<DatasetName, DatasetConfig>,

    #[serde(default)]
    pub node: BTreeMap<NodeName, NodeConfig>,
}

/// A `[dataset.<name>]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DatasetConfig {
    /// In-memory, optionally seeded with a value.
    Memory {
        #[serde(default)]
        data: Option<Data>,
    },
    /// A JSON file. Relative paths are resolved against the config file's
    /// directory.
    Json { path: PathBuf },
}

/// A `[node.<name>]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    pub cmd: String,

    #[serde(default)]
    pub inputs: Vec<DatasetName>,

    #[serde(default)]
    pub outputs: Vec<DatasetName>,

    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// A validated pipeline file.
///
/// `order` lists every node name in a topological order, ties broken by name.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub runner: RunnerOptions,
    pub dataset: BTreeMap<DatasetName, DatasetConfig>,
    pub node: BTreeMap<NodeName, NodeConfig>,
    pub order: Vec<NodeName>,
}

impl ConfigFile {
    /// Build without validation. Prefer `ConfigFile::try_from(raw)`.
    pub fn new_unchecked(
        runner: RunnerOptions,
        dataset: BTreeMap<DatasetName, DatasetConfig>,
        node: BTreeMap<NodeName, NodeConfig>,
        order: Vec<NodeName>,
    ) -> Self {
        Self {
            runner,
            dataset,
            node,
            order,
        }
    }

    /// Node sections in execution order.
    pub fn ordered_nodes(&self) -> impl Iterator<Item = (&NodeName, &NodeConfig)> {
        self.order
            .iter()
            .filter_map(|name| self.node.get_key_value(name))
    }
}
