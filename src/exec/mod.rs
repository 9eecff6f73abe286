// src/exec/mod.rs

//! Process execution layer.
//!
//! Turns the `cmd` of a `[node.<name>]` section into a [`Node`](crate::pipeline::Node)
//! whose function runs the command with `tokio::process::Command`, exchanging
//! data with it as JSON over stdin/stdout.

pub mod command;

pub use command::{CommandSpec, command_node, run_command};
