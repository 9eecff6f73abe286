// src/types.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

/// Canonical dataset identifier used throughout the crate.
pub type DatasetName = String;

/// Canonical node identifier.
pub type NodeName = String;

/// Payload held by a dataset.
pub type Data = serde_json::Value;

/// Values handed to a node function, keyed by input dataset name.
pub type Inputs = BTreeMap<DatasetName, Data>;

/// Values returned by a node function, keyed by output dataset name.
pub type Outputs = BTreeMap<DatasetName, Data>;

/// How a catalog materialises a dataset name it has no explicit entry for.
///
/// - `Memory`: a fresh, non-persistent in-memory dataset (default).
/// - `Json`: a JSON file named `<dir>/<dataset>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DefaultDataset {
    Memory,
    Json { dir: PathBuf },
}

impl Default for DefaultDataset {
    fn default() -> Self {
        DefaultDataset::Memory
    }
}

impl FromStr for DefaultDataset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("memory") {
            return Ok(DefaultDataset::Memory);
        }
        match s.split_once(':') {
            Some((kind, dir)) if kind.eq_ignore_ascii_case("json") && !dir.is_empty() => {
                Ok(DefaultDataset::Json {
                    dir: PathBuf::from(dir),
                })
            }
            _ => Err(format!(
                "invalid default dataset: {s} (expected \"memory\" or \"json:<dir>\")"
            )),
        }
    }
}
