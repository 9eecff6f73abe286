// src/config/mod.rs

//! Pipeline file handling.
//!
//! - [`model`] holds the serde model of `Seqpipe.toml`.
//! - [`validate`] converts the raw model into a checked [`ConfigFile`] and
//!   computes the node order.
//! - [`loader`] reads files from disk.
//! - [`assemble`] builds the [`Pipeline`](crate::pipeline::Pipeline),
//!   [`DataCatalog`](crate::io::DataCatalog) and runner options.

pub mod assemble;
pub mod loader;
pub mod model;
pub mod validate;

pub use assemble::Project;
pub use loader::{config_root_dir, default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, DatasetConfig, NodeConfig, RawConfigFile};
