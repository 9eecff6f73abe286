// src/io/mod.rs

//! Dataset storage.
//!
//! The runner only talks to a [`DatasetStore`].
//!
//! - [`dataset`] holds the [`Dataset`] trait plus memory and JSON-file
//!   implementations.
//! - [`catalog`] provides [`DataCatalog`], a registry of datasets with a
//!   configurable fallback for unregistered names.

pub mod catalog;
pub mod dataset;

pub use catalog::DataCatalog;
pub use dataset::{Dataset, JsonDataset, MemoryDataset};

use crate::errors::DatasetError;
use crate::types::Data;

/// Keyed storage the runner loads node inputs from and saves node outputs to.
///
/// Implementations must tolerate concurrent `load`/`save` calls when the
/// runner is configured for async I/O.
pub trait DatasetStore: Send + Sync {
    fn load(&self, name: &str) -> Result<Data, DatasetError>;

    fn save(&self, name: &str, data: Data) -> Result<(), DatasetError>;

    /// Hint that the runner will not read `name` again during this run.
    ///
    /// Called at most once per name per run. Must not fail.
    fn release(&self, name: &str);

    fn exists(&self, name: &str) -> Result<bool, DatasetError>;

    /// Whether `name` survives the process, i.e. a later run could load it
    /// instead of recomputing it. Used for resume suggestions.
    fn is_persisted(&self, name: &str) -> bool;
}
