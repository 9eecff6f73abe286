// src/exec/command.rs

//! Shell-command nodes.
//!
//! The node's inputs are written to the child's stdin as one JSON object keyed
//! by dataset name. The child must print a JSON object keyed by output name on
//! stdout. Each invocation gets its own current-thread tokio runtime, so the
//! node function can be called from any plain thread.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::Result as SeqpipeResult;
use crate::pipeline::{Node, NodeFn};
use crate::types::{Data, DatasetName, Inputs, NodeName, Outputs};

/// Everything needed to run one command node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub node: NodeName,
    pub cmd: String,
    pub timeout: Option<Duration>,
}

/// Build a [`Node`] that runs `spec.cmd` through the platform shell.
pub fn command_node(
    spec: CommandSpec,
    inputs: Vec<DatasetName>,
    outputs: Vec<DatasetName>,
) -> SeqpipeResult<Node> {
    let name = spec.node.clone();
    let spec = Arc::new(spec);
    let func: NodeFn = Arc::new(move |inputs: &Inputs| run_command(&spec, inputs));
    Node::from_fn(name, inputs, outputs, func)
}

/// Run the command once, blocking the calling thread until it exits.
///
/// Must not be called from within a tokio runtime.
pub fn run_command(spec: &CommandSpec, inputs: &Inputs) -> Result<Outputs> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .with_context(|| format!("building runtime for node '{}'", spec.node))?;
    runtime.block_on(run_command_async(spec, inputs))
}

async fn run_command_async(spec: &CommandSpec, inputs: &Inputs) -> Result<Outputs> {
    info!(node = %spec.node, cmd = %spec.cmd, "starting command");

    let payload = serde_json::to_vec(inputs)
        .with_context(|| format!("encoding inputs for node '{}'", spec.node))?;

    let mut cmd = shell_command(&spec.cmd);
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for node '{}'", spec.node))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("stdin of node '{}' was not captured", spec.node))?;
    let writer = tokio::spawn(async move {
        let result = stdin.write_all(&payload).await;
        drop(stdin);
        result
    });

    let output = match spec.timeout {
        Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| {
                anyhow!(
                    "command for node '{}' timed out after {}s",
                    spec.node,
                    limit.as_secs_f64()
                )
            })?,
        None => child.wait_with_output().await,
    }
    .with_context(|| format!("waiting for process of node '{}'", spec.node))?;

    // A child that ignores its stdin may close the pipe early.
    match writer.await {
        Ok(Err(e)) => debug!(node = %spec.node, error = %e, "stdin write did not complete"),
        Err(e) => debug!(node = %spec.node, error = %e, "stdin writer task failed"),
        Ok(Ok(())) => {}
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    for line in stderr.lines() {
        debug!(node = %spec.node, "stderr: {}", line);
    }

    let code = output.status.code().unwrap_or(-1);
    info!(
        node = %spec.node,
        exit_code = code,
        success = output.status.success(),
        "command exited"
    );
    if !output.status.success() {
        match stderr.lines().last() {
            Some(last) => bail!(
                "command for node '{}' exited with code {code}: {last}",
                spec.node
            ),
            None => bail!("command for node '{}' exited with code {code}", spec.node),
        }
    }

    parse_outputs(&spec.node, &output.stdout)
}

fn shell_command(line: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(line);
        c
    }
}

/// Empty stdout counts as an empty object, for nodes without outputs.
fn parse_outputs(node: &str, stdout: &[u8]) -> Result<Outputs> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(Outputs::new());
    }

    let value: Data = serde_json::from_slice(stdout)
        .with_context(|| format!("stdout of node '{node}' is not valid JSON"))?;
    match value {
        Data::Object(map) => Ok(map.into_iter().collect()),
        other => bail!("stdout of node '{node}' must be a JSON object, got {other}"),
    }
}
