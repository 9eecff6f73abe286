// tests/runner_failure.rs

mod common;
use crate::common::{
    PipelineBuilder, RecordingHooks, RecordingReporter, RecordingStore, as_store, async_runner,
    init_tracing, no_hooks, sequential_runner,
};

use std::fmt;
use std::sync::Arc;

use serde_json::json;
use seqpipe::errors::SeqpipeError;
use seqpipe::hooks::Hooks;
use seqpipe::io::{DataCatalog, MemoryDataset};
use seqpipe::pipeline::Node;
use seqpipe::runner::ResumeSuggestion;
use seqpipe::types::{Inputs, Outputs};

#[derive(Debug)]
struct QuotaExceeded(u32);

impl fmt::Display for QuotaExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "quota exceeded by {}", self.0)
    }
}

impl std::error::Error for QuotaExceeded {}

#[test]
fn failing_node_stops_the_run_without_releasing() {
    init_tracing();

    let builder = PipelineBuilder::new()
        .node("n1", &[], &["a"])
        .failing("n2", &["a"], &["b"], "boom")
        .node("n3", &["b"], &["c"]);
    let executed = builder.executed();
    let pipeline = builder.build();
    let store = RecordingStore::new();
    let reporter = RecordingReporter::new();

    let failure = sequential_runner()
        .with_reporter(reporter.clone())
        .run_sequential(&pipeline, as_store(&store), no_hooks(), None)
        .unwrap_err();

    assert_eq!(failure.node, "n2");
    assert_eq!(failure.done_nodes, vec!["n1"]);
    assert_eq!(failure.to_string(), "boom");
    assert_eq!(*executed.lock().unwrap(), vec!["n1", "n2"]);
    assert!(store.releases().is_empty());
    assert_eq!(reporter.calls(), vec![vec!["n1".to_string()]]);
}

#[test]
fn original_error_is_returned_unchanged() {
    init_tracing();

    let node = Node::new("spend", ["budget"], ["spent"], |_: &Inputs| -> anyhow::Result<Outputs> {
        Err(QuotaExceeded(7).into())
    })
    .unwrap();
    let pipeline = PipelineBuilder::new().with_node(node).build();
    let store = RecordingStore::new();
    store.seed("budget", json!(10));

    let failure = sequential_runner()
        .run_sequential(&pipeline, as_store(&store), no_hooks(), None)
        .unwrap_err();

    assert_eq!(failure.suggestion, ResumeSuggestion::NothingRan);
    let error = failure.into_error();
    assert_eq!(error.downcast_ref::<QuotaExceeded>().map(|q| q.0), Some(7));
}

#[test]
fn reporter_sees_every_node_before_the_failure() {
    init_tracing();

    let mut builder = PipelineBuilder::new().node("n0", &["in"], &["d0"]);
    for i in 1..4 {
        let (name, input, output) = (format!("n{i}"), format!("d{}", i - 1), format!("d{i}"));
        builder = builder.node(&name, &[input.as_str()], &[output.as_str()]);
    }
    let pipeline = builder.failing("n4", &["d3"], &["d4"], "late failure").build();
    let store = RecordingStore::new();
    store.seed("in", json!(0));
    let reporter = RecordingReporter::new();

    let failure = sequential_runner()
        .with_reporter(reporter.clone())
        .run_sequential(&pipeline, as_store(&store), no_hooks(), None)
        .unwrap_err();

    let expected: Vec<String> = (0..4).map(|i| format!("n{i}")).collect();
    assert_eq!(failure.done_nodes, expected);
    assert_eq!(reporter.calls(), vec![expected]);
    // d0..d2 were released as the chain progressed; d3 was still needed.
    assert_eq!(store.releases(), vec!["d0", "d1", "d2"]);
    // Nothing was persisted, so the advice is to start over from n0.
    assert_eq!(
        failure.suggestion.cli_argument().as_deref(),
        Some("--from-nodes \"n0\"")
    );
}

#[test]
fn resume_advice_stops_at_persisted_inputs() {
    init_tracing();

    let pipeline = PipelineBuilder::new()
        .node("ingest", &["raw"], &["table"])
        .node("features", &["table"], &["matrix"])
        .failing("train", &["matrix", "params:lr"], &["model"], "diverged")
        .build();
    let store = RecordingStore::new();
    store.seed("raw", json!([]));
    store.seed("params:lr", json!(0.1));
    store.persist("raw");
    store.persist("matrix");

    let failure = sequential_runner()
        .run_sequential(&pipeline, as_store(&store), no_hooks(), None)
        .unwrap_err();

    assert_eq!(
        failure.suggestion,
        ResumeSuggestion::FromNodes {
            remaining: 1,
            start_nodes: vec!["train".to_string()],
        }
    );
}

#[test]
fn on_node_error_hook_fires_before_the_failure_is_returned() {
    init_tracing();

    let pipeline = PipelineBuilder::new()
        .failing("only", &[], &["x"], "nope")
        .build();
    let hooks = RecordingHooks::new();
    let as_hooks: Arc<dyn Hooks> = hooks.clone();

    let failure = sequential_runner()
        .run_sequential(&pipeline, as_store(&RecordingStore::new()), as_hooks, None)
        .unwrap_err();

    assert_eq!(failure.to_string(), "nope");
    assert_eq!(hooks.events(), vec!["before_run:only", "error:only"]);
}

#[test]
fn async_mode_reports_failures_the_same_way() {
    init_tracing();

    let pipeline = PipelineBuilder::new()
        .node("n1", &["in"], &["a"])
        .failing("n2", &["a"], &["b"], "async boom")
        .build();
    let store = RecordingStore::new();
    store.seed("in", json!(1));
    let reporter = RecordingReporter::new();

    let failure = async_runner(2)
        .with_reporter(reporter.clone())
        .run_sequential(&pipeline, as_store(&store), no_hooks(), None)
        .unwrap_err();

    assert_eq!(failure.to_string(), "async boom");
    assert_eq!(reporter.calls().len(), 1);
    assert!(store.releases().is_empty());
}

#[test]
fn missing_input_fails_the_node_that_reads_it() {
    init_tracing();

    // `in` was never seeded, so the load fails.
    let pipeline = PipelineBuilder::new().node("n1", &["in"], &["out"]).build();
    let catalog = DataCatalog::new();
    catalog
        .add("in", Arc::new(MemoryDataset::new()), false)
        .unwrap();

    let err = sequential_runner()
        .run(&pipeline, &catalog, None, None)
        .unwrap_err();

    match err {
        SeqpipeError::Run(failure) => {
            assert_eq!(failure.node, "n1");
            assert!(failure.to_string().contains("Failed while loading data from dataset 'in'"));
        }
        other => panic!("expected a run failure, got {other:?}"),
    }
}
