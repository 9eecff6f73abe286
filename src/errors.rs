// src/errors.rs

//! Crate-wide error types.

use thiserror::Error;

use crate::runner::RunFailure;
use crate::types::DatasetName;

#[derive(Error, Debug)]
pub enum SeqpipeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid node: {0}")]
    InvalidNode(String),

    #[error("Invalid pipeline: {0}")]
    InvalidPipeline(String),

    #[error("Cycle detected in pipeline: {0}")]
    PipelineCycle(String),

    #[error("Pipeline input(s) {0:?} not found in the data catalog")]
    UnsatisfiedInputs(Vec<DatasetName>),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Run(#[from] RunFailure),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors raised by the data catalog and its datasets.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Dataset '{0}' not found in the catalog")]
    NotFound(DatasetName),

    #[error("Dataset '{0}' has already been registered")]
    AlreadyExists(DatasetName),

    /// Loading an in-memory dataset before anything was saved to it, or
    /// after it was released.
    #[error("Data for MemoryDataset has not been saved yet")]
    NotSaved,

    #[error("Failed while loading data from dataset '{name}': {source}")]
    Load {
        name: DatasetName,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed while saving data to dataset '{name}': {source}")]
    Save {
        name: DatasetName,
        #[source]
        source: anyhow::Error,
    },

    #[error("Invalid regular expression provided: '{pattern}'")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SeqpipeError>;
