// src/io/catalog.rs

//! Name-keyed registry of datasets with a fallback for unregistered names.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use regex::Regex;
use tracing::{debug, warn};

use crate::errors::DatasetError;
use crate::io::DatasetStore;
use crate::io::dataset::{Dataset, JsonDataset, MemoryDataset};
use crate::types::{Data, DatasetName, DefaultDataset};

/// Registry of datasets.
///
/// When a `default` is configured, any name that is not registered is
/// materialised on first access (see [`DefaultDataset`]) and registered from
/// then on.
#[derive(Debug, Default)]
pub struct DataCatalog {
    datasets: RwLock<BTreeMap<DatasetName, Arc<dyn Dataset>>>,
    default: Option<DefaultDataset>,
}

impl DataCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback used for unregistered names.
    pub fn with_default(mut self, default: DefaultDataset) -> Self {
        self.default = Some(default);
        self
    }

    pub fn default_dataset(&self) -> Option<&DefaultDataset> {
        self.default.as_ref()
    }

    /// Copy sharing the same dataset instances.
    pub fn shallow_copy(&self) -> Self {
        Self {
            datasets: RwLock::new(self.snapshot()),
            default: self.default.clone(),
        }
    }

    /// Shallow copy that falls back to `default` unless this catalog already
    /// has a fallback of its own.
    pub fn shallow_copy_with_default(&self, default: &DefaultDataset) -> Self {
        let mut copy = self.shallow_copy();
        if copy.default.is_none() {
            copy.default = Some(default.clone());
        }
        copy
    }

    fn snapshot(&self) -> BTreeMap<DatasetName, Arc<dyn Dataset>> {
        self.read_map().clone()
    }

    /// Register a dataset under `name`.
    pub fn add(
        &self,
        name: impl Into<DatasetName>,
        dataset: Arc<dyn Dataset>,
        replace: bool,
    ) -> Result<(), DatasetError> {
        let name = name.into();
        let mut map = self.write_map();
        if map.contains_key(&name) {
            if !replace {
                return Err(DatasetError::AlreadyExists(name));
            }
            warn!(dataset = %name, "replacing dataset already registered in the catalog");
        }
        map.insert(name, dataset);
        Ok(())
    }

    /// Register one in-memory dataset per entry, holding the given value.
    pub fn add_feed_dict<I, K>(&self, feed: I, replace: bool) -> Result<(), DatasetError>
    where
        I: IntoIterator<Item = (K, Data)>,
        K: Into<DatasetName>,
    {
        for (name, data) in feed {
            self.add(name, Arc::new(MemoryDataset::with_data(data)), replace)?;
        }
        Ok(())
    }

    /// Whether `name` is explicitly registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.read_map().contains_key(name)
    }

    /// Whether `name` can be resolved, either because it is registered or
    /// because a fallback would materialise it.
    pub fn contains(&self, name: &str) -> bool {
        self.default.is_some() || self.is_registered(name)
    }

    /// Whether loading `name` would find data: it is registered, or the
    /// fallback is file-backed and its file is already on disk.
    ///
    /// An in-memory fallback never satisfies a read on its own, since the
    /// dataset it materialises starts empty.
    pub fn is_satisfiable(&self, name: &str) -> bool {
        if self.is_registered(name) {
            return true;
        }
        match &self.default {
            Some(DefaultDataset::Json { dir }) => json_path(dir, name).is_file(),
            Some(DefaultDataset::Memory) | None => false,
        }
    }

    /// Registered names, optionally filtered by a regular expression.
    pub fn list(&self, pattern: Option<&str>) -> Result<Vec<DatasetName>, DatasetError> {
        let names = self.read_map().keys().cloned().collect::<Vec<_>>();
        let Some(pattern) = pattern else {
            return Ok(names);
        };

        let re = Regex::new(pattern).map_err(|source| DatasetError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(names.into_iter().filter(|n| re.is_match(n)).collect())
    }

    /// Resolve `name` to its dataset, materialising it from the fallback if
    /// needed.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Dataset>, DatasetError> {
        if let Some(ds) = self.read_map().get(name) {
            return Ok(Arc::clone(ds));
        }

        let Some(default) = &self.default else {
            return Err(DatasetError::NotFound(name.to_string()));
        };

        let mut map = self.write_map();
        let ds = map.entry(name.to_string()).or_insert_with(|| {
            debug!(dataset = %name, ?default, "materialising dataset from catalog default");
            materialise(name, default)
        });
        Ok(Arc::clone(ds))
    }

    fn read_map(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<DatasetName, Arc<dyn Dataset>>> {
        self.datasets
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_map(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, BTreeMap<DatasetName, Arc<dyn Dataset>>> {
        self.datasets
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn materialise(name: &str, default: &DefaultDataset) -> Arc<dyn Dataset> {
    match default {
        DefaultDataset::Memory => Arc::new(MemoryDataset::new()),
        DefaultDataset::Json { dir } => Arc::new(JsonDataset::new(json_path(dir, name))),
    }
}

fn json_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.json"))
}

impl DatasetStore for DataCatalog {
    fn load(&self, name: &str) -> Result<Data, DatasetError> {
        let ds = self.get(name)?;
        debug!(dataset = %name, "loading data");
        ds.load().map_err(|source| DatasetError::Load {
            name: name.to_string(),
            source,
        })
    }

    fn save(&self, name: &str, data: Data) -> Result<(), DatasetError> {
        let ds = self.get(name)?;
        debug!(dataset = %name, "saving data");
        ds.save(data).map_err(|source| DatasetError::Save {
            name: name.to_string(),
            source,
        })
    }

    fn release(&self, name: &str) {
        let ds = self.read_map().get(name).cloned();
        match ds {
            Some(ds) => {
                debug!(dataset = %name, "releasing data");
                ds.release();
            }
            None => warn!(dataset = %name, "release requested for dataset not in the catalog"),
        }
    }

    fn exists(&self, name: &str) -> Result<bool, DatasetError> {
        let ds = self.read_map().get(name).cloned();
        match ds {
            Some(ds) => ds.exists().map_err(|source| DatasetError::Load {
                name: name.to_string(),
                source,
            }),
            None => Ok(false),
        }
    }

    fn is_persisted(&self, name: &str) -> bool {
        self.read_map()
            .get(name)
            .is_some_and(|ds| !ds.is_ephemeral())
    }
}
