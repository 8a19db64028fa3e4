mod common;

use common::*;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use uptime_core::checks::CheckState;
use uptime_core::config::SchedulerConfig;
use uptime_core::probe::ErrorCause;
use uptime_core::scheduler::{AlertDelivery, CheckResult};
use uptime_core::{MemoryRecordStore, ProbeOutcome, RecordStore};

async fn store_with(records: Vec<serde_json::Value>) -> Arc<dyn RecordStore> {
    let store = MemoryRecordStore::new();
    for record in records {
        let id = record["id"].as_str().unwrap().to_string();
        store.create("checks", &id, &record).await.unwrap();
    }
    Arc::new(store)
}

#[tokio::test]
async fn test_up_then_down_then_down_alerts_once() {
    let id = check_id(1);
    let store = store_with(vec![check_record(&id, "example.test/status", 3)]).await;
    let transport = ScriptedTransport::new().script(
        "example.test/status",
        vec![Reply::Status(200), Reply::Status(500), Reply::Status(500)],
    );
    let harness = Harness::new(store, transport, RecordingNotifier::default());

    let first = harness.scheduler.run_sweep().await;
    assert_eq!(first.evaluated, 1);
    assert_eq!(first.alerts_sent, 0);
    let record = harness.stored(&id).await;
    assert_eq!(record["state"], "up");
    assert!(record["lastChecked"].as_i64().unwrap() > 0);

    let second = harness.scheduler.run_sweep().await;
    assert_eq!(second.alerts_sent, 1);
    assert_eq!(harness.stored(&id).await["state"], "down");

    let third = harness.scheduler.run_sweep().await;
    assert_eq!(third.alerts_sent, 0);
    assert_eq!(harness.stored(&id).await["state"], "down");

    assert_eq!(
        harness.notifier.messages(),
        vec![(
            PHONE.to_string(),
            "Alert: Your check for GET http://example.test/status is currently down".to_string()
        )]
    );

    let entries = harness.logger().read_entries(&id).await.unwrap();
    let observed: Vec<(CheckState, bool)> = entries.iter().map(|e| (e.state, e.alert)).collect();
    assert_eq!(
        observed,
        vec![
            (CheckState::Up, false),
            (CheckState::Down, true),
            (CheckState::Down, false)
        ]
    );
    // Each entry carries the definition as it was before that evaluation.
    assert_eq!(entries[0].check.last_checked, None);
    assert_eq!(entries[1].check.state, CheckState::Up);
    assert_eq!(entries[1].outcome, ProbeOutcome::Responded { status: 500 });

    let metrics = harness.scheduler.metrics().snapshot();
    assert_eq!(metrics.sweeps_completed, 3);
    assert_eq!(metrics.checks_evaluated, 3);
    assert_eq!(metrics.alerts_sent, 1);
}

#[tokio::test]
async fn test_first_failure_does_not_alert() {
    let id = check_id(2);
    let store = store_with(vec![check_record(&id, "down.test/", 3)]).await;
    let transport = ScriptedTransport::new().script("down.test/", vec![Reply::Fail("connection refused")]);
    let harness = Harness::new(store, transport, RecordingNotifier::default());

    harness.scheduler.run_sweep().await;

    assert_eq!(harness.stored(&id).await["state"], "down");
    assert!(harness.notifier.messages().is_empty());
    let entries = harness.logger().read_entries(&id).await.unwrap();
    assert!(matches!(
        entries[0].outcome,
        ProbeOutcome::Error { cause: ErrorCause::Network, .. }
    ));
}

#[tokio::test]
async fn test_invalid_records_are_skipped_without_probing() {
    let zero_timeout = check_id(3);
    let bad_phone = check_id(4);
    let mut phone_record = check_record(&bad_phone, "example.test/", 3);
    phone_record["phone"] = serde_json::json!("123");

    let store = store_with(vec![check_record(&zero_timeout, "example.test/", 0), phone_record]).await;
    let transport = ScriptedTransport::new().script("example.test/", vec![Reply::Status(200)]);
    let harness = Harness::new(store, transport, RecordingNotifier::default());

    let report = harness.scheduler.run_sweep().await;

    assert_eq!(report.listed, 2);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.evaluated, 0);
    assert_eq!(harness.transport.calls.load(Ordering::SeqCst), 0);

    let untouched = harness.stored(&zero_timeout).await;
    assert!(untouched.get("state").is_none());
    assert!(untouched.get("lastChecked").is_none());
    assert!(harness.logger().read_entries(&zero_timeout).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_record_with_mismatched_id_is_skipped() {
    let store = MemoryRecordStore::new();
    store
        .create("checks", &check_id(5), &check_record(&check_id(6), "example.test/", 3))
        .await
        .unwrap();
    let transport = ScriptedTransport::new().script("example.test/", vec![Reply::Status(200)]);
    let harness = Harness::new(Arc::new(store), transport, RecordingNotifier::default());

    let (result, _) = harness.scheduler.evaluate_check(&check_id(5)).await;
    assert_eq!(result, CheckResult::Skipped);
    assert_eq!(harness.transport.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_notification_failure_keeps_transition() {
    let id = check_id(7);
    let mut record = check_record(&id, "flaky.test/", 3);
    record["state"] = serde_json::json!("up");
    record["lastChecked"] = serde_json::json!(1_700_000_000_000i64);

    let store = store_with(vec![record]).await;
    let transport = ScriptedTransport::new().script("flaky.test/", vec![Reply::Status(503)]);
    let harness = Harness::new(store, transport, RecordingNotifier::failing());

    let report = harness.scheduler.run_sweep().await;

    assert_eq!(report.evaluated, 1);
    assert_eq!(report.alerts_failed, 1);
    assert_eq!(harness.notifier.messages().len(), 1);

    let stored = harness.stored(&id).await;
    assert_eq!(stored["state"], "down");
    assert!(stored["lastChecked"].as_i64().unwrap() > 1_700_000_000_000);

    let entries = harness.logger().read_entries(&id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].alert);
}

#[tokio::test]
async fn test_persistence_failure_emits_nothing() {
    let id = check_id(8);
    let mut record = check_record(&id, "example.test/", 3);
    record["state"] = serde_json::json!("up");
    record["lastChecked"] = serde_json::json!(1_700_000_000_000i64);

    let inner = MemoryRecordStore::new();
    inner.create("checks", &id, &record).await.unwrap();
    let store = Arc::new(ReadOnlyStore(inner));
    let transport = ScriptedTransport::new().script("example.test/", vec![Reply::Status(500)]);
    let harness = Harness::new(store, transport, RecordingNotifier::default());

    let report = harness.scheduler.run_sweep().await;

    assert_eq!(report.failed, 1);
    assert_eq!(report.evaluated, 0);
    assert_eq!(harness.transport.calls.load(Ordering::SeqCst), 1);
    assert!(harness.notifier.messages().is_empty());
    assert!(harness.logger().read_entries(&id).await.unwrap().is_empty());
    assert_eq!(harness.stored(&id).await["state"], "up");
}

#[tokio::test]
async fn test_logging_failure_does_not_block_state_or_alert() {
    let id = check_id(9);
    let mut record = check_record(&id, "example.test/", 3);
    record["state"] = serde_json::json!("down");
    record["lastChecked"] = serde_json::json!(1_700_000_000_000i64);

    let store = store_with(vec![record]).await;
    let transport = ScriptedTransport::new().script("example.test/", vec![Reply::Status(200)]);
    let harness = Harness::new(store, transport, RecordingNotifier::default());
    std::fs::remove_dir(harness.logs.path()).unwrap();

    let (result, logged) = harness.scheduler.evaluate_check(&id).await;

    assert!(!logged);
    assert_eq!(result, CheckResult::Evaluated { alert: AlertDelivery::Sent });
    assert_eq!(harness.stored(&id).await["state"], "up");
    assert_eq!(harness.notifier.messages().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_after_up_alerts_down() {
    let id = check_id(10);
    let mut record = check_record(&id, "slow.test/", 2);
    record["state"] = serde_json::json!("up");
    record["lastChecked"] = serde_json::json!(1_700_000_000_000i64);

    let store = store_with(vec![record]).await;
    let transport = ScriptedTransport::new().script("slow.test/", vec![Reply::Hang]);
    let harness = Harness::new(store, transport, RecordingNotifier::default());

    let started = tokio::time::Instant::now();
    let report = harness.scheduler.run_sweep().await;
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_secs(2));
    assert!(elapsed < Duration::from_secs(3));
    assert_eq!(report.alerts_sent, 1);
    assert_eq!(harness.stored(&id).await["state"], "down");

    let entries = harness.logger().read_entries(&id).await.unwrap();
    assert!(entries[0].outcome.is_timeout());
    assert!(harness.notifier.messages()[0].1.ends_with("is currently down"));
}

#[tokio::test(start_paused = true)]
async fn test_probe_timeout_is_capped_by_config() {
    let id = check_id(11);
    let store = store_with(vec![check_record(&id, "slow.test/", 30)]).await;
    let transport = ScriptedTransport::new().script("slow.test/", vec![Reply::After(Duration::from_secs(10), 200)]);
    let config = SchedulerConfig {
        max_timeout_seconds: 5,
        ..SchedulerConfig::default()
    };
    let harness = Harness::with_config(store, transport, RecordingNotifier::default(), config);

    harness.scheduler.run_sweep().await;

    let entries = harness.logger().read_entries(&id).await.unwrap();
    assert!(entries[0].outcome.is_timeout());
    assert_eq!(entries[0].state, CheckState::Down);
}

#[tokio::test(start_paused = true)]
async fn test_checks_fan_out_up_to_cap_without_cross_talk() {
    let mut records = Vec::new();
    let mut transport = ScriptedTransport::new();
    for n in 0..6 {
        let url = format!("host{}.test/", n);
        records.push(check_record(&check_id(100 + n), &url, 5));
        let status = if n % 2 == 0 { 200 } else { 500 };
        transport = transport.script(&url, vec![Reply::After(Duration::from_millis(500 * (6 - n as u64)), status)]);
    }
    let store = store_with(records).await;
    let config = SchedulerConfig {
        max_concurrent_checks: 2,
        ..SchedulerConfig::default()
    };
    let harness = Harness::with_config(store, transport, RecordingNotifier::default(), config);

    let report = harness.scheduler.run_sweep().await;

    assert_eq!(report.evaluated, 6);
    assert_eq!(harness.transport.max_in_flight.load(Ordering::SeqCst), 2);
    for n in 0..6 {
        let id = check_id(100 + n);
        let expected = if n % 2 == 0 { "up" } else { "down" };
        assert_eq!(harness.stored(&id).await["state"], expected, "check {}", id);
        let entries = harness.logger().read_entries(&id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].check.id, id);
    }
}

#[tokio::test]
async fn test_sweep_with_no_checks() {
    let harness = Harness::new(
        Arc::new(MemoryRecordStore::new()),
        ScriptedTransport::new(),
        RecordingNotifier::default(),
    );
    let report = harness.scheduler.run_sweep().await;
    assert_eq!(report.listed, 0);
    assert_eq!(harness.scheduler.metrics().snapshot().sweeps_completed, 1);
}

#[tokio::test]
async fn test_sweep_saves_normalized_definition() {
    let id = check_id(12);
    let mut record = check_record(&id, "  example.test/norm ", 3);
    record["protocol"] = serde_json::json!(" HTTP ");
    record["method"] = serde_json::json!("Get ");
    record["successCodes"] = serde_json::json!([201, 200]);
    record["label"] = serde_json::json!("homepage");

    let store = store_with(vec![record]).await;
    let transport = ScriptedTransport::new().script("example.test/norm", vec![Reply::Status(200)]);
    let harness = Harness::new(store, transport, RecordingNotifier::default());

    let report = harness.scheduler.run_sweep().await;
    assert_eq!(report.evaluated, 1);

    let stored = harness.stored(&id).await;
    assert_eq!(stored["protocol"], "http");
    assert_eq!(stored["method"], "get");
    assert_eq!(stored["url"], "example.test/norm");
    assert_eq!(stored["successCodes"], serde_json::json!([200, 201]));
    assert_eq!(stored["state"], "up");
    assert!(stored["lastChecked"].as_i64().unwrap() > 0);
    assert_eq!(stored["label"], "homepage");
}
