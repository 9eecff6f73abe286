// src/pipeline/mod.rs

//! Pipeline representation.
//!
//! - [`node`] holds the immutable computation step.
//! - [`graph`] holds the ordered node sequence plus its free inputs/outputs.

pub mod graph;
pub mod node;

pub use graph::Pipeline;
pub use node::{Node, NodeFn};
