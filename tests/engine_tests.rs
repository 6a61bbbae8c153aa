//! Engine composition: offline mode, the config mutex and shared sessions.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::*;
use junos_engine::prelude::*;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn offline_engine(dir: &TempDir) -> Engine {
    let mut config = EngineConfig::default();
    config.connection.host = "fw1".to_string();
    config.offline.enabled = true;
    config.offline.artifact_path = Some(dir.path().join("fw1.set"));
    Engine::new(config)
}

#[tokio::test]
async fn test_offline_commits_append_in_order() {
    let dir = TempDir::new().unwrap();
    let engine = offline_engine(&dir);

    let mut first = engine.open_session().await.unwrap();
    let record = first
        .apply(["set system host-name fw1", "set system time-zone UTC"], "first")
        .await
        .unwrap();
    assert_eq!(record.outcome, CommitOutcome::WrittenOffline);
    assert_eq!(record.lines.len(), 2);
    first.close().await.unwrap();

    let mut second = engine.open_session().await.unwrap();
    second.stage("delete system ntp");
    let record = second.apply_and_commit("second").await.unwrap();
    assert_eq!(record.outcome, CommitOutcome::WrittenOffline);
    second.close().await.unwrap();

    let content = std::fs::read_to_string(dir.path().join("fw1.set")).unwrap();
    assert_eq!(
        content,
        "set system host-name fw1\nset system time-zone UTC\ndelete system ntp\n"
    );
}

#[tokio::test]
async fn test_offline_empty_commit_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let engine = offline_engine(&dir);

    let mut session = engine.open_session().await.unwrap();
    let record = session.apply(Vec::<String>::new(), "empty").await.unwrap();
    assert_eq!(record.outcome, CommitOutcome::Skipped);
    assert!(!dir.path().join("fw1.set").exists());
}

#[tokio::test]
async fn test_offline_write_failure_is_reported() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "").unwrap();

    let mut config = EngineConfig::default();
    config.offline.enabled = true;
    config.offline.artifact_path = Some(blocker.join("out.set"));
    let engine = Engine::new(config);

    let mut session = engine.open_session().await.unwrap();
    session.stage("set system host-name fw1");
    let err = session.apply_and_commit("blocked").await.unwrap_err();
    assert!(matches!(err, Error::OfflineWrite { .. }));
}

#[tokio::test]
async fn test_engine_applies_lock_policy() {
    let device = SimulatedDevice::new();
    device.configure(|s| s.busy_locks = 2);

    let mut config = EngineConfig::default();
    config.lock = RetryPolicy::new()
        .with_initial_delay(Duration::from_millis(5))
        .with_max_delay(Duration::from_millis(20));
    let engine = Engine::new(config);

    let mut session = engine.open_session_with(device.boxed()).await.unwrap();
    let record = session.apply(["set system host-name R1"], "contended").await.unwrap();
    assert_eq!(record.outcome, CommitOutcome::Committed);
    assert_eq!(device.rpcs().iter().filter(|r| r.as_str() == "lock").count(), 3);
}

#[tokio::test]
async fn test_read_transform_serializes_sections() {
    let engine = Engine::new(EngineConfig::default());
    let active = Arc::new(AtomicUsize::new(0));
    let overlap = Arc::new(AtomicUsize::new(0));

    let mut tasks = Vec::new();
    for i in 0..4 {
        let engine = engine.clone();
        let active = active.clone();
        let overlap = overlap.clone();
        let device = SimulatedDevice::new().with_running(&["set system host-name R1"]);
        tasks.push(tokio::spawn(async move {
            let mut session = engine.open_session_with(device.boxed()).await.unwrap();
            let guard = engine.config_mutex().lock().await;
            if active.fetch_add(1, Ordering::SeqCst) > 0 {
                overlap.fetch_add(1, Ordering::SeqCst);
            }
            let output = session.command("show configuration system host-name").await.unwrap();
            tokio::time::sleep(Duration::from_millis(5 * (i + 1))).await;
            active.fetch_sub(1, Ordering::SeqCst);
            drop(guard);
            session.close().await.unwrap();
            output
        }));
    }

    for task in tasks {
        assert!(task.await.unwrap().contains("host-name R1;"));
    }
    assert_eq!(overlap.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_read_transform_returns_transform_result() {
    let engine = Engine::new(EngineConfig::default());
    let device = SimulatedDevice::new().with_running(&["set system host-name R1"]);
    let mut session = engine.open_session_with(device.boxed()).await.unwrap();

    let lines = engine
        .read_transform(&mut session, "show configuration system | display set relative", |raw| {
            Ok(raw.lines().filter(|l| l.starts_with("set ")).count())
        })
        .await
        .unwrap();
    assert_eq!(lines, 1);
    assert!(engine.config_mutex().try_lock().is_some());

    let err = engine
        .read_transform(&mut session, "show bogus", |_| Ok(()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DeviceCommand { .. }));
    assert!(engine.config_mutex().try_lock().is_some());
}
