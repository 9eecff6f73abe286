#![allow(dead_code)]

pub use seqpipe_test_utils::*;

use std::sync::Arc;

use seqpipe::hooks::{HookManager, Hooks};
use seqpipe::io::DatasetStore;
use seqpipe::runner::{RunnerOptions, SequentialRunner};

pub fn sequential_runner() -> SequentialRunner {
    SequentialRunner::new(RunnerOptions::default()).expect("sequential runner")
}

pub fn async_runner(io_workers: usize) -> SequentialRunner {
    SequentialRunner::new(RunnerOptions {
        is_async: true,
        io_workers,
        ..RunnerOptions::default()
    })
    .expect("async runner")
}

pub fn no_hooks() -> Arc<dyn Hooks> {
    Arc::new(HookManager::new())
}

pub fn as_store(store: &Arc<RecordingStore>) -> Arc<dyn DatasetStore> {
    store.clone()
}
