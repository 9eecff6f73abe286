// src/config/validate.rs

use std::collections::{BTreeMap, BTreeSet};

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, DatasetConfig, RawConfigFile};
use crate::errors::{Result, SeqpipeError};
use crate::types::{DefaultDataset, NodeName};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SeqpipeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        let order = execution_order(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.runner, raw.dataset, raw.node, order))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_nodes(cfg)?;
    validate_runner_config(cfg)?;
    validate_datasets(cfg)?;
    validate_nodes(cfg)?;
    Ok(())
}

fn ensure_has_nodes(cfg: &RawConfigFile) -> Result<()> {
    if cfg.node.is_empty() {
        return Err(SeqpipeError::ConfigError(
            "config must contain at least one [node.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_runner_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.runner.io_workers == 0 {
        return Err(SeqpipeError::ConfigError(
            "[runner].io_workers must be >= 1 (got 0)".to_string(),
        ));
    }

    if let DefaultDataset::Json { dir } = &cfg.runner.default_dataset {
        if dir.as_os_str().is_empty() {
            return Err(SeqpipeError::ConfigError(
                "[runner].default_dataset of type \"json\" needs a non-empty `dir`".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_datasets(cfg: &RawConfigFile) -> Result<()> {
    for (name, dataset) in cfg.dataset.iter() {
        if let DatasetConfig::Json { path } = dataset {
            if path.as_os_str().is_empty() {
                return Err(SeqpipeError::ConfigError(format!(
                    "dataset '{name}' of type \"json\" needs a non-empty `path`"
                )));
            }
        }
    }
    Ok(())
}

fn validate_nodes(cfg: &RawConfigFile) -> Result<()> {
    let mut producers: BTreeMap<&str, &str> = BTreeMap::new();

    for (name, node) in cfg.node.iter() {
        if node.cmd.trim().is_empty() {
            return Err(SeqpipeError::ConfigError(format!(
                "node '{name}' has an empty `cmd`"
            )));
        }
        if node.timeout_secs == Some(0) {
            return Err(SeqpipeError::ConfigError(format!(
                "node '{name}' has timeout_secs = 0; omit it to disable the timeout"
            )));
        }

        for output in node.outputs.iter() {
            if let Some(other) = producers.insert(output.as_str(), name.as_str()) {
                if other != name.as_str() {
                    return Err(SeqpipeError::InvalidPipeline(format!(
                        "dataset '{output}' is produced by both '{other}' and '{name}'"
                    )));
                }
            }
        }
    }

    Ok(())
}

/// Topologically sort the nodes, breaking ties by name.
///
/// Edge direction: producer -> consumer. For
///   [node.B]
///   inputs = ["x"]
/// where `x` is an output of `A`, we add edge A -> B.
fn execution_order(cfg: &RawConfigFile) -> Result<Vec<NodeName>> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    let mut producer_of: BTreeMap<&str, &str> = BTreeMap::new();
    for (name, node) in cfg.node.iter() {
        graph.add_node(name.as_str());
        for output in node.outputs.iter() {
            producer_of.insert(output.as_str(), name.as_str());
        }
    }

    for (name, node) in cfg.node.iter() {
        for input in node.inputs.iter() {
            if let Some(producer) = producer_of.get(input.as_str()) {
                graph.add_edge(*producer, name.as_str(), ());
            }
        }
    }

    // A topological sort will fail if there is a cycle.
    if let Err(cycle) = toposort(&graph, None) {
        return Err(SeqpipeError::PipelineCycle(format!(
            "cycle detected in pipeline involving node '{}'",
            cycle.node_id()
        )));
    }

    // Kahn's algorithm over a sorted frontier, so the order is stable.
    let mut pending: BTreeMap<&str, usize> = graph
        .nodes()
        .map(|n| (n, graph.neighbors_directed(n, Direction::Incoming).count()))
        .collect();
    let mut ready: BTreeSet<&str> = pending
        .iter()
        .filter(|(_, deps)| **deps == 0)
        .map(|(n, _)| *n)
        .collect();

    let mut order = Vec::with_capacity(pending.len());
    while let Some(next) = ready.pop_first() {
        order.push(next.to_string());
        for consumer in graph.neighbors_directed(next, Direction::Outgoing) {
            if let Some(deps) = pending.get_mut(consumer) {
                *deps -= 1;
                if *deps == 0 {
                    ready.insert(consumer);
                }
            }
        }
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<ConfigFile> {
        let raw: RawConfigFile = toml::from_str(toml_src)?;
        ConfigFile::try_from(raw)
    }

    #[test]
    fn orders_by_dependency_then_name() {
        let cfg = parse(
            r#"
            [node.report]
            cmd = "true"
            inputs = ["b", "c"]

            [node.zeta]
            cmd = "true"
            inputs = ["a"]
            outputs = ["c"]

            [node.alpha]
            cmd = "true"
            inputs = ["a"]
            outputs = ["b"]

            [node.source]
            cmd = "true"
            outputs = ["a"]
            "#,
        )
        .unwrap();

        assert_eq!(cfg.order, vec!["source", "alpha", "zeta", "report"]);
    }

    #[test]
    fn rejects_cycles() {
        let err = parse(
            r#"
            [node.a]
            cmd = "true"
            inputs = ["y"]
            outputs = ["x"]

            [node.b]
            cmd = "true"
            inputs = ["x"]
            outputs = ["y"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, SeqpipeError::PipelineCycle(_)));
    }

    #[test]
    fn rejects_two_producers() {
        let err = parse(
            r#"
            [node.a]
            cmd = "true"
            outputs = ["x"]

            [node.b]
            cmd = "true"
            outputs = ["x"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, SeqpipeError::InvalidPipeline(_)));
    }

    #[test]
    fn rejects_zero_io_workers() {
        let err = parse(
            r#"
            [runner]
            io_workers = 0

            [node.a]
            cmd = "true"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, SeqpipeError::ConfigError(msg) if msg.contains("io_workers")));
    }

    #[test]
    fn rejects_empty_config() {
        let err = parse("").unwrap_err();
        assert!(matches!(err, SeqpipeError::ConfigError(_)));
    }

    #[test]
    fn unknown_dataset_type_is_a_parse_error() {
        let err = parse(
            r#"
            [dataset.x]
            type = "parquet"

            [node.a]
            cmd = "true"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, SeqpipeError::TomlError(_)));
    }
}
