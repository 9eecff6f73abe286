// src/io/dataset.rs

//! Concrete dataset implementations.

use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use tracing::debug;

use crate::errors::DatasetError;
use crate::types::Data;

/// A single named data artifact, without knowledge of its own name.
///
/// Implementations must be safe to load and save from several threads at once
/// (the runner's async I/O mode does this).
pub trait Dataset: Send + Sync + Debug {
    fn load(&self) -> Result<Data>;
    fn save(&self, data: Data) -> Result<()>;
    fn exists(&self) -> Result<bool>;

    /// Drop any cached materialisation. Must not fail.
    fn release(&self) {}

    /// Ephemeral datasets lose their contents when the process exits.
    fn is_ephemeral(&self) -> bool {
        false
    }
}

/// Non-persistent dataset holding its value in memory.
#[derive(Debug, Default)]
pub struct MemoryDataset {
    data: Mutex<Option<Data>>,
}

impl MemoryDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: Data) -> Self {
        Self {
            data: Mutex::new(Some(data)),
        }
    }
}

impl Dataset for MemoryDataset {
    fn load(&self) -> Result<Data> {
        let guard = self
            .data
            .lock()
            .map_err(|_| anyhow!("memory dataset lock poisoned"))?;
        guard
            .clone()
            .ok_or_else(|| DatasetError::NotSaved.into())
    }

    fn save(&self, data: Data) -> Result<()> {
        let mut guard = self
            .data
            .lock()
            .map_err(|_| anyhow!("memory dataset lock poisoned"))?;
        *guard = Some(data);
        Ok(())
    }

    fn exists(&self) -> Result<bool> {
        let guard = self
            .data
            .lock()
            .map_err(|_| anyhow!("memory dataset lock poisoned"))?;
        Ok(guard.is_some())
    }

    fn release(&self) {
        if let Ok(mut guard) = self.data.lock() {
            *guard = None;
        }
    }

    fn is_ephemeral(&self) -> bool {
        true
    }
}

/// Persistent dataset stored as a pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonDataset {
    path: PathBuf,
}

impl JsonDataset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Dataset for JsonDataset {
    fn load(&self) -> Result<Data> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("reading file {:?}", self.path))?;
        let data = serde_json::from_str(&contents)
            .with_context(|| format!("parsing JSON from {:?}", self.path))?;
        Ok(data)
    }

    fn save(&self, data: Data) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating dir {:?}", parent))?;
            }
        }
        let bytes = serde_json::to_vec_pretty(&data)
            .with_context(|| format!("serialising JSON for {:?}", self.path))?;
        fs::write(&self.path, bytes).with_context(|| format!("writing file {:?}", self.path))?;
        debug!(path = ?self.path, "wrote JSON dataset");
        Ok(())
    }

    fn exists(&self) -> Result<bool> {
        Ok(self.path.is_file())
    }
}
