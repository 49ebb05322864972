// tests/progress_invariants.rs

mod common;
use common::harness;

use std::collections::HashSet;

use proptest::prelude::*;
use scanbatch::batch::BatchStatus;
use scanbatch::config::ScanTool;
use scanbatch_test_utils::builders::BatchConfigBuilder;
use scanbatch_test_utils::fake_executor::{FakeScanExecutor, ScriptedRun};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Whatever mix of runs succeed or fail, the progress counters always
    /// reconcile with the total and the concurrency cap holds.
    #[test]
    fn counters_reconcile_for_any_failure_mix(
        total in 1u32..12,
        cap in 1usize..5,
        failing in prop::collection::hash_set(0u32..12, 0..12),
    ) {
        let failing: HashSet<u32> = failing.into_iter().filter(|i| *i < total).collect();

        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();

        rt.block_on(async {
            let mut fake = FakeScanExecutor::new(ScriptedRun::default());
            for index in &failing {
                fake = fake.with_run(*index, ScriptedRun::exiting(137));
            }
            let h = harness(cap, fake);
            let cfg = BatchConfigBuilder::new(ScanTool::Nikto)
                .repetitions(total)
                .build();
            let batch = h.registry.create_batch(cfg).unwrap();

            let driver = h.scheduler.start_batch(&batch.id).unwrap();
            tokio::time::timeout(std::time::Duration::from_secs(10), driver)
                .await
                .expect("batch did not complete in time")
                .unwrap();

            let status = h.registry.get_status(&batch.id).unwrap();
            prop_assert_eq!(status.status, BatchStatus::Completed);
            prop_assert_eq!(status.progress.total, total);
            prop_assert_eq!(status.progress.failed, failing.len() as u32);
            prop_assert_eq!(
                status.progress.completed + status.progress.failed,
                total
            );
            prop_assert_eq!(status.progress.running, 0);
            prop_assert_eq!(status.progress.pending(), 0);

            prop_assert!(
                h.stats.max_active() <= cap,
                "cap {} exceeded: {} concurrent runs",
                cap,
                h.stats.max_active()
            );

            // Every run is individually terminal and consistent with the
            // scripted outcome.
            for run in &status.runs {
                if failing.contains(&run.index) {
                    prop_assert!(run.error.is_some());
                } else {
                    prop_assert!(run.result.is_some());
                }
            }
            Ok(())
        })?;
    }
}
