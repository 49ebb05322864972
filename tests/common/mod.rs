#![allow(dead_code)]

use std::sync::Arc;

use scanbatch::batch::BatchRegistry;
use scanbatch::scheduler::Scheduler;
use scanbatch_test_utils::builders::settings_with_cap;
use scanbatch_test_utils::fake_executor::{ExecStats, FakeScanExecutor};

pub use scanbatch_test_utils::{init_tracing, with_timeout};

/// Registry + scheduler wired to a fake executor, rooted in a temp dir.
pub struct Harness {
    // Keeps the artifact root alive for the duration of the test.
    pub dir: tempfile::TempDir,
    pub registry: Arc<BatchRegistry>,
    pub scheduler: Arc<Scheduler>,
    pub stats: Arc<ExecStats>,
}

pub fn harness(concurrency: usize, fake: FakeScanExecutor) -> Harness {
    init_tracing();

    let dir = tempfile::tempdir().expect("tempdir");
    let registry = Arc::new(BatchRegistry::new(dir.path()));
    let stats = Arc::clone(&fake.stats);
    let scheduler = Scheduler::new(
        Arc::clone(&registry),
        Arc::new(fake),
        settings_with_cap(concurrency),
    );

    Harness {
        dir,
        registry,
        scheduler,
        stats,
    }
}
