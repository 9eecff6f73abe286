// tests/outer_run.rs

mod common;
use crate::common::{PipelineBuilder, RecordingHooks, init_tracing, sequential_runner};

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::json;
use seqpipe::errors::SeqpipeError;
use seqpipe::hooks::Hooks;
use seqpipe::io::{DataCatalog, DatasetStore, JsonDataset};
use seqpipe::pipeline::{Node, Pipeline};
use seqpipe::runner::{RunnerOptions, SequentialRunner};
use seqpipe::types::{DefaultDataset, Inputs, Outputs};

fn json_default_runner(dir: &Path) -> SequentialRunner {
    SequentialRunner::new(RunnerOptions {
        default_dataset: DefaultDataset::Json {
            dir: dir.to_path_buf(),
        },
        ..RunnerOptions::default()
    })
    .unwrap()
}

#[test]
fn unregistered_free_inputs_are_rejected_up_front() {
    init_tracing();

    let builder = PipelineBuilder::new()
        .node("n1", &["zeta", "alpha"], &["mid"])
        .node("n2", &["mid", "beta"], &["out"]);
    let executed = builder.executed();
    let pipeline = builder.build();
    let catalog = DataCatalog::new();
    catalog.add_feed_dict([("beta", json!(1))], false).unwrap();

    let err = sequential_runner()
        .run(&pipeline, &catalog, None, None)
        .unwrap_err();

    match err {
        SeqpipeError::UnsatisfiedInputs(missing) => assert_eq!(missing, vec!["alpha", "zeta"]),
        other => panic!("expected unsatisfied inputs, got {other:?}"),
    }
    assert!(executed.lock().unwrap().is_empty());
}

#[test]
fn returns_unpersisted_free_outputs() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let pipeline = PipelineBuilder::new()
        .node("split", &["raw"], &["left", "right"])
        .node("keep", &["left"], &["kept"])
        .node("store", &["right"], &["archived"])
        .build();

    let catalog = DataCatalog::new();
    catalog.add_feed_dict([("raw", json!([1, 2]))], false).unwrap();
    let archive = dir.path().join("archived.json");
    catalog
        .add("archived", Arc::new(JsonDataset::new(&archive)), false)
        .unwrap();

    let outputs = sequential_runner()
        .run(&pipeline, &catalog, None, None)
        .unwrap();

    assert_eq!(outputs.keys().collect::<Vec<_>>(), vec!["kept"]);
    assert_eq!(outputs["kept"], json!({"by": "keep", "inputs": 1}));
    assert!(archive.is_file());
}

#[test]
fn caller_catalog_is_not_modified() {
    init_tracing();

    let pipeline = PipelineBuilder::new()
        .node("n1", &["in"], &["mid"])
        .node("n2", &["mid"], &["out"])
        .build();
    let catalog = DataCatalog::new();
    catalog.add_feed_dict([("in", json!("x"))], false).unwrap();

    let outputs = sequential_runner()
        .run(&pipeline, &catalog, None, None)
        .unwrap();

    assert!(outputs.contains_key("out"));
    assert_eq!(catalog.list(None).unwrap(), vec!["in"]);
    assert_eq!(catalog.load("in").unwrap(), json!("x"));
}

#[test]
fn json_default_writes_intermediates_to_disk() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let pipeline = PipelineBuilder::new()
        .node("n1", &["in"], &["mid"])
        .node("n2", &["mid"], &["out"])
        .build();
    let catalog = DataCatalog::new();
    catalog.add_feed_dict([("in", json!(5))], false).unwrap();

    let runner = SequentialRunner::new(RunnerOptions {
        default_dataset: DefaultDataset::Json {
            dir: dir.path().to_path_buf(),
        },
        ..RunnerOptions::default()
    })
    .unwrap();

    let outputs = runner.run(&pipeline, &catalog, None, None).unwrap();

    // `out` was unregistered, so it is returned even though it lives on disk.
    assert_eq!(outputs["out"], json!({"by": "n2", "inputs": 1}));
    // Releasing a JSON file dataset leaves the file in place.
    assert!(dir.path().join("mid.json").is_file());
    assert!(dir.path().join("out.json").is_file());
}

#[test]
fn hooks_are_forwarded_by_the_outer_run() {
    init_tracing();

    let pipeline = PipelineBuilder::new().node("n1", &["in"], &["out"]).build();
    let catalog = DataCatalog::new();
    catalog.add_feed_dict([("in", json!(0))], false).unwrap();
    let hooks = RecordingHooks::new();
    let as_hooks: Arc<dyn Hooks> = hooks.clone();

    sequential_runner()
        .run(&pipeline, &catalog, Some(as_hooks), Some("session"))
        .unwrap();

    assert!(hooks.events().contains(&"after_run:n1".to_string()));
}

/// in -> n1 -> x -> n2 -> y -> n3 -> z, where n2 fails while `fail` is set.
fn flaky_chain(fail: Arc<AtomicBool>) -> Pipeline {
    let n2 = Node::new("n2", ["x"], ["y"], move |inputs: &Inputs| -> anyhow::Result<Outputs> {
        if fail.load(Ordering::SeqCst) {
            anyhow::bail!("flaky");
        }
        Ok(Outputs::from([("y".to_string(), inputs["x"].clone())]))
    })
    .unwrap();

    PipelineBuilder::new()
        .node("n1", &["in"], &["x"])
        .with_node(n2)
        .node("n3", &["y"], &["z"])
        .build()
}

#[test]
fn resume_advice_under_a_json_default_can_be_followed() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let runner = json_default_runner(dir.path());
    let fail = Arc::new(AtomicBool::new(true));
    let pipeline = flaky_chain(Arc::clone(&fail));

    let catalog = DataCatalog::new();
    catalog.add_feed_dict([("in", json!(3))], false).unwrap();
    let failure = match runner.run(&pipeline, &catalog, None, None).unwrap_err() {
        SeqpipeError::Run(failure) => failure,
        other => panic!("expected a run failure, got {other:?}"),
    };
    assert_eq!(
        failure.suggestion.cli_argument().as_deref(),
        Some("--from-nodes \"n2\"")
    );

    // A fresh catalog without `in`: `x` is only reachable through its file.
    fail.store(false, Ordering::SeqCst);
    let resumed = pipeline.from_nodes(&["n2"]).unwrap();
    let outputs = runner.run(&resumed, &DataCatalog::new(), None, None).unwrap();

    assert_eq!(outputs["z"], json!({"by": "n3", "inputs": 1}));
    let y: serde_json::Value =
        serde_json::from_slice(&fs::read(dir.path().join("y.json")).unwrap()).unwrap();
    assert_eq!(y, json!({"by": "n1", "inputs": 1}));
}

#[test]
fn json_default_without_the_file_is_still_unsatisfied() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let pipeline = PipelineBuilder::new().node("n2", &["x"], &["y"]).build();

    let err = json_default_runner(dir.path())
        .run(&pipeline, &DataCatalog::new(), None, None)
        .unwrap_err();

    assert!(matches!(err, SeqpipeError::UnsatisfiedInputs(missing) if missing == vec!["x"]));
}

/// raw -> n1 -> mid -> n2 -> out, with `out` persisted to `dir`.
fn two_step(dir: &Path, mid_on_disk: bool) -> (Pipeline, Arc<std::sync::Mutex<Vec<String>>>, DataCatalog) {
    let builder = PipelineBuilder::new()
        .node("n1", &["raw"], &["mid"])
        .node("n2", &["mid"], &["out"]);
    let executed = builder.executed();

    let catalog = DataCatalog::new();
    catalog.add_feed_dict([("raw", json!([1]))], false).unwrap();
    let mid = dir.join("mid.json");
    if mid_on_disk {
        fs::write(&mid, r#"{"by": "earlier", "inputs": 1}"#).unwrap();
    }
    catalog.add("mid", Arc::new(JsonDataset::new(&mid)), false).unwrap();
    catalog
        .add("out", Arc::new(JsonDataset::new(dir.join("out.json"))), false)
        .unwrap();

    (builder.build(), executed, catalog)
}

#[test]
fn only_missing_skips_producers_of_persisted_intermediates() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let (pipeline, executed, catalog) = two_step(dir.path(), true);

    let outputs = sequential_runner()
        .run_only_missing(&pipeline, &catalog, None, None)
        .unwrap();

    assert!(outputs.is_empty());
    assert_eq!(*executed.lock().unwrap(), vec!["n2"]);
    assert_eq!(catalog.load("out").unwrap(), json!({"by": "n2", "inputs": 1}));
}

#[test]
fn only_missing_rebuilds_a_missing_intermediate_and_its_readers() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let (pipeline, executed, catalog) = two_step(dir.path(), false);

    sequential_runner()
        .run_only_missing(&pipeline, &catalog, None, None)
        .unwrap();

    assert_eq!(*executed.lock().unwrap(), vec!["n1", "n2"]);
    assert!(dir.path().join("mid.json").is_file());
}

#[test]
fn only_missing_pulls_in_producers_of_unregistered_inputs() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let builder = PipelineBuilder::new()
        .node("n1", &["raw"], &["mid"])
        .node("n2", &["mid"], &["out"]);
    let executed = builder.executed();
    let pipeline = builder.build();

    // `mid` is unregistered, so only a rerun of n1 can provide it.
    let catalog = DataCatalog::new();
    catalog.add_feed_dict([("raw", json!([1]))], false).unwrap();
    catalog
        .add("out", Arc::new(JsonDataset::new(dir.path().join("out.json"))), false)
        .unwrap();

    sequential_runner()
        .run_only_missing(&pipeline, &catalog, None, None)
        .unwrap();

    assert_eq!(*executed.lock().unwrap(), vec!["n1", "n2"]);
}

#[test]
fn only_missing_with_everything_present_runs_nothing() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let (pipeline, executed, catalog) = two_step(dir.path(), true);
    fs::write(dir.path().join("out.json"), "1").unwrap();

    let outputs = sequential_runner()
        .run_only_missing(&pipeline, &catalog, None, None)
        .unwrap();

    assert!(outputs.is_empty());
    assert!(executed.lock().unwrap().is_empty());
}
