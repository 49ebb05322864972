// tests/report_pipeline.rs

mod common;
use common::{harness, with_timeout};

use scanbatch::artifacts;
use scanbatch::batch::RunStatus;
use scanbatch::config::ScanTool;
use scanbatch_test_utils::builders::BatchConfigBuilder;
use scanbatch_test_utils::fake_executor::{FakeScanExecutor, ScriptedRun};

#[tokio::test]
async fn zap_findings_flow_from_stdout_into_the_report() {
    let fake = FakeScanExecutor::new(
        // zap-baseline exits 2 when WARN-NEW alerts are present.
        ScriptedRun::exiting(2).with_stdout(&[
            "Total of 12 URLs",
            "WARN-NEW: Missing Anti-clickjacking Header [10020]",
            "PASS: Vulnerable JS Library [10003]",
            "FAIL-NEW: SQL Injection [40018]",
        ]),
    );
    let h = harness(1, fake);
    let cfg = BatchConfigBuilder::new(ScanTool::ZapBaseline).repetitions(1).build();
    let batch = h.registry.create_batch(cfg).unwrap();

    let driver = h.scheduler.start_batch(&batch.id).unwrap();
    with_timeout(driver).await.unwrap();

    let status = h.registry.get_status(&batch.id).unwrap();
    assert_eq!(status.runs[0].status, RunStatus::Completed);
    assert!(status.runs[0].result.as_ref().unwrap().findings_present);

    let raw = std::fs::read_to_string(artifacts::raw_output_path(&batch.output_dir, 0)).unwrap();
    assert!(raw.contains("WARN-NEW: Missing Anti-clickjacking Header [10020]"));

    let report = std::fs::read_to_string(artifacts::report_path(&batch.output_dir, 0)).unwrap();
    assert!(report.contains("## Findings (2)"));
    assert!(report.contains("Missing Anti-clickjacking Header"));
    assert!(report.contains("SQL Injection"));
    assert!(report.contains("- plugin id: 10020"));
    assert!(report.contains("HIGH: 1, MEDIUM: 1"));
    // Manifest lists the raw output artifact.
    assert!(report.contains("run-0-output.txt"));
}

#[tokio::test]
async fn structured_report_findings_are_appended() {
    let fake = FakeScanExecutor::new(
        ScriptedRun::exiting(2).with_stdout(&["WARN-NEW: X-Frame-Options Header Not Set [10020]"]),
    );
    let h = harness(1, fake);
    let cfg = BatchConfigBuilder::new(ScanTool::ZapBaseline).repetitions(1).build();
    let batch = h.registry.create_batch(cfg).unwrap();

    // Simulate the tool leaving a structured report next to its output.
    std::fs::write(
        artifacts::structured_report_path(&batch.output_dir, 0),
        r#"{"site": [{"alerts": [
            {"alert": "X-Frame-Options Header Not Set", "riskcode": "2", "confidence": "3", "pluginid": "10020"}
        ]}]}"#,
    )
    .unwrap();

    let driver = h.scheduler.start_batch(&batch.id).unwrap();
    with_timeout(driver).await.unwrap();

    let report = std::fs::read_to_string(artifacts::report_path(&batch.output_dir, 0)).unwrap();
    // One text finding plus one structured finding, not deduplicated.
    assert!(report.contains("## Findings (2)"));
    assert!(report.contains("- confidence: high"));
    assert!(report.contains("run-0-report.json"));
}

#[tokio::test]
async fn malformed_structured_report_degrades_to_placeholder() {
    let fake = FakeScanExecutor::new(ScriptedRun::exiting(0));
    let h = harness(1, fake);
    let cfg = BatchConfigBuilder::new(ScanTool::ZapBaseline).repetitions(1).build();
    let batch = h.registry.create_batch(cfg).unwrap();

    std::fs::write(
        artifacts::structured_report_path(&batch.output_dir, 0),
        "this is not json",
    )
    .unwrap();

    let driver = h.scheduler.start_batch(&batch.id).unwrap();
    with_timeout(driver).await.unwrap();

    // Extraction never aborts synthesis; the report carries a placeholder.
    let report = std::fs::read_to_string(artifacts::report_path(&batch.output_dir, 0)).unwrap();
    assert!(report.contains("Unparsed scanner output"));
    assert!(report.contains("## Findings (1)"));
}

#[tokio::test]
async fn failed_run_still_gets_raw_output_and_report() {
    let fake = FakeScanExecutor::new(
        ScriptedRun::exiting(42).with_stdout(&["+ Server: Apache banner retrieved"]),
    );
    let h = harness(1, fake);
    let cfg = BatchConfigBuilder::new(ScanTool::Nikto).repetitions(1).build();
    let batch = h.registry.create_batch(cfg).unwrap();

    let driver = h.scheduler.start_batch(&batch.id).unwrap();
    with_timeout(driver).await.unwrap();

    let status = h.registry.get_status(&batch.id).unwrap();
    assert_eq!(status.runs[0].status, RunStatus::Failed);

    // Captured output survives the failure, and the report reflects it.
    let raw = std::fs::read_to_string(artifacts::raw_output_path(&batch.output_dir, 0)).unwrap();
    assert!(raw.contains("Apache banner"));

    let report = std::fs::read_to_string(artifacts::report_path(&batch.output_dir, 0)).unwrap();
    assert!(report.contains("- status: failed"));
    assert!(report.contains("Apache banner retrieved"));
}

#[tokio::test]
async fn clean_run_reports_zero_findings() {
    let fake = FakeScanExecutor::new(ScriptedRun::exiting(0).with_stdout(&["PASS: everything"]));
    let h = harness(1, fake);
    let cfg = BatchConfigBuilder::new(ScanTool::ZapBaseline).repetitions(1).build();
    let batch = h.registry.create_batch(cfg).unwrap();

    let driver = h.scheduler.start_batch(&batch.id).unwrap();
    with_timeout(driver).await.unwrap();

    let status = h.registry.get_status(&batch.id).unwrap();
    assert!(!status.runs[0].result.as_ref().unwrap().findings_present);

    let report = std::fs::read_to_string(artifacts::report_path(&batch.output_dir, 0)).unwrap();
    assert!(report.contains("## Findings (0)"));
    assert!(report.contains("No findings were extracted"));
}
