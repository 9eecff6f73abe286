// src/pipeline/node.rs

//! A single computation step with declared inputs and outputs.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use anyhow::bail;

use crate::errors::{Result, SeqpipeError};
use crate::types::{DatasetName, Inputs, NodeName, Outputs};

/// The function a node wraps.
pub type NodeFn = Arc<dyn Fn(&Inputs) -> anyhow::Result<Outputs> + Send + Sync>;

/// Immutable description of one computation step.
///
/// Nodes are identified by name: two nodes with the same name compare equal.
/// Cloning is cheap, the wrapped function is shared.
#[derive(Clone)]
pub struct Node {
    name: NodeName,
    inputs: Vec<DatasetName>,
    outputs: Vec<DatasetName>,
    func: NodeFn,
}

impl Node {
    /// Create a node.
    ///
    /// Fails when the name is empty, when `inputs` or `outputs` list a dataset
    /// twice, or when a dataset is both an input and an output.
    pub fn new<I, O, F>(name: impl Into<NodeName>, inputs: I, outputs: O, func: F) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<DatasetName>,
        O: IntoIterator,
        O::Item: Into<DatasetName>,
        F: Fn(&Inputs) -> anyhow::Result<Outputs> + Send + Sync + 'static,
    {
        Self::from_fn(name, inputs, outputs, Arc::new(func))
    }

    /// Same as [`Node::new`], for an already shared function.
    pub fn from_fn<I, O>(
        name: impl Into<NodeName>,
        inputs: I,
        outputs: O,
        func: NodeFn,
    ) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<DatasetName>,
        O: IntoIterator,
        O::Item: Into<DatasetName>,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SeqpipeError::InvalidNode(
                "node name must not be empty".to_string(),
            ));
        }

        let inputs: Vec<DatasetName> = inputs.into_iter().map(Into::into).collect();
        let outputs: Vec<DatasetName> = outputs.into_iter().map(Into::into).collect();

        ensure_unique(&name, "inputs", &inputs)?;
        ensure_unique(&name, "outputs", &outputs)?;

        let overlap: Vec<&DatasetName> = outputs.iter().filter(|o| inputs.contains(o)).collect();
        if !overlap.is_empty() {
            return Err(SeqpipeError::InvalidNode(format!(
                "node '{name}' cannot have the same inputs and outputs: {overlap:?}"
            )));
        }

        Ok(Self {
            name,
            inputs,
            outputs,
            func,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Input dataset names in declaration order.
    pub fn inputs(&self) -> &[DatasetName] {
        &self.inputs
    }

    /// Output dataset names in declaration order.
    pub fn outputs(&self) -> &[DatasetName] {
        &self.outputs
    }

    /// Invoke the wrapped function and check it returned exactly the declared
    /// outputs.
    pub fn run(&self, inputs: &Inputs) -> anyhow::Result<Outputs> {
        let outputs = (self.func)(inputs)?;

        let declared: BTreeSet<&str> = self.outputs.iter().map(String::as_str).collect();
        let returned: BTreeSet<&str> = outputs.keys().map(String::as_str).collect();
        if declared != returned {
            bail!(
                "node '{}' declares outputs {:?} but its function returned {:?}",
                self.name,
                declared,
                returned
            );
        }

        Ok(outputs)
    }
}

fn ensure_unique(node: &str, what: &str, names: &[DatasetName]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(SeqpipeError::InvalidNode(format!(
                "node '{node}' lists dataset '{name}' twice in its {what}"
            )));
        }
    }
    Ok(())
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}([{}]) -> [{}]",
            self.name,
            self.inputs.join(","),
            self.outputs.join(",")
        )
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}
