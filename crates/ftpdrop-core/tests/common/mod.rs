#![allow(dead_code)]

pub mod mock_source;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ftpdrop_core::events::MemorySink;
use ftpdrop_core::pipeline::{Credentials, Pipeline, TransferJob};
use ftpdrop_core::retry::RetryPolicy;

use mock_source::MockSource;

/// Job rooted in a temp dir: `<root>/staging` relocated to `<root>/out/inbox`.
pub fn job_in(root: &Path, size_threshold: u64) -> TransferJob {
    TransferJob {
        host: "mock.example.net".to_string(),
        credentials: Credentials::new("drop", "hunter2"),
        remote_dir: "/outgoing".to_string(),
        staging_dir: root.join("staging"),
        destination_dir: root.join("out").join("inbox"),
        size_threshold,
    }
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
    }
}

pub fn pipeline(job: TransferJob, source: &MockSource) -> (Pipeline, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let pipeline = Pipeline::new(job, Arc::new(source.clone()), sink.clone()).with_retry(fast_retry());
    (pipeline, sink)
}

/// File names directly under `dir`, sorted. Empty if `dir` is missing.
pub fn names_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|rd| {
            rd.filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
