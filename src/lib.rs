// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod hooks;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod runner;
pub mod types;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::{config_root_dir, load_and_validate};
use crate::config::{ConfigFile, Project};
use crate::runner::SequentialRunner;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - pipeline file loading and assembly
/// - CLI overrides of the runner options
/// - optional `--from-nodes` narrowing
/// - the sequential runner, or its `--only-missing` variant
///
/// and prints the pipeline's returned outputs as JSON on stdout.
pub fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading pipeline file '{}'", config_path.display()))?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let Project {
        pipeline,
        catalog,
        mut options,
    } = cfg.assemble(&config_root_dir(&config_path))?;

    if args.is_async {
        options.is_async = true;
    }
    if let Some(default) = args.default_dataset.clone() {
        options.default_dataset = default;
    }

    let pipeline = if args.from_nodes.is_empty() {
        pipeline
    } else {
        let narrowed = pipeline.from_nodes(&args.from_nodes)?;
        info!(
            from = ?args.from_nodes,
            nodes = narrowed.len(),
            "running a partial pipeline"
        );
        narrowed
    };

    let runner = SequentialRunner::new(options)?;
    let session_id = args.session_id.as_deref();
    let outputs = if args.only_missing {
        runner.run_only_missing(&pipeline, &catalog, None, session_id)?
    } else {
        runner.run(&pipeline, &catalog, None, session_id)?
    };

    println!("{}", serde_json::to_string_pretty(&outputs)?);
    Ok(())
}

/// Simple dry-run output: print runner options and nodes in execution order.
fn print_dry_run(cfg: &ConfigFile) {
    println!("seqpipe dry-run");
    println!("  runner.is_async = {}", cfg.runner.is_async);
    println!("  runner.io_workers = {}", cfg.runner.io_workers);
    println!("  runner.default_dataset = {:?}", cfg.runner.default_dataset);
    println!();

    println!("datasets ({}):", cfg.dataset.len());
    for (name, dataset) in cfg.dataset.iter() {
        println!("  - {name}: {dataset:?}");
    }
    println!();

    println!("nodes ({}), in execution order:", cfg.order.len());
    for (name, node) in cfg.ordered_nodes() {
        println!("  - {name}");
        println!("      cmd: {}", node.cmd);
        if !node.inputs.is_empty() {
            println!("      inputs: {:?}", node.inputs);
        }
        if !node.outputs.is_empty() {
            println!("      outputs: {:?}", node.outputs);
        }
        if let Some(secs) = node.timeout_secs {
            println!("      timeout_secs: {secs}");
        }
    }

    debug!("dry-run complete (no execution)");
}
