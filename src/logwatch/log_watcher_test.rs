use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use tokio::time::Instant;

use crate::constants::PID_LINE_GROUP;
use crate::constants::PID_LINE_PATTERN;
use crate::test_utils::MemoryLogSource;
use crate::LogWatcher;
use crate::MockLogSource;

const INTERVAL: Duration = Duration::from_millis(100);

fn log_path() -> PathBuf {
    PathBuf::from("/ws/7000/server.log")
}

fn watcher(logs: &Arc<MemoryLogSource>) -> LogWatcher {
    LogWatcher::new(logs.clone(), INTERVAL)
}

#[tokio::test(start_paused = true)]
async fn test_contains_finds_line_appended_while_waiting() {
    let logs = Arc::new(MemoryLogSource::new());
    logs.set(&log_path(), "1:M * Server initialized\n");
    let watcher = watcher(&logs);

    let writer = {
        let logs = logs.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(750)).await;
            logs.append(&log_path(), "1:M * Cluster state changed: ok\n");
        })
    };

    let started = Instant::now();
    assert!(
        watcher
            .contains(&log_path(), "Cluster state changed: ok", Duration::from_secs(5))
            .await
    );
    assert!(started.elapsed() >= Duration::from_millis(750));
    assert!(started.elapsed() < Duration::from_secs(1));
    writer.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_absent_pattern_returns_none_within_timeout_plus_interval() {
    let logs = Arc::new(MemoryLogSource::new());
    logs.set(&log_path(), "1:M * Ready to accept connections tcp\n");
    let watcher = watcher(&logs);
    let pattern = Regex::new(r"sync: Finished with success").unwrap();
    let timeout = Duration::from_secs(2);

    let started = Instant::now();
    let found = watcher.wait_for_pattern(&log_path(), &pattern, timeout).await;

    assert!(found.is_none());
    assert!(started.elapsed() >= timeout);
    assert!(started.elapsed() <= timeout + INTERVAL);
}

#[tokio::test(start_paused = true)]
async fn test_missing_file_counts_as_empty() {
    let logs = Arc::new(MemoryLogSource::new());
    let watcher = watcher(&logs);

    assert!(
        !watcher
            .contains(Path::new("/nowhere/server.log"), "Ready", Duration::from_millis(300))
            .await
    );
    assert!(watcher.snapshot(Path::new("/nowhere/server.log")).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_pid_line_group_is_extracted() {
    let logs = Arc::new(MemoryLogSource::new());
    logs.set(
        &log_path(),
        "4711:C 01 Jan 2025 * oO0OoO0OoO0Oo Valkey is starting oO0OoO0OoO0Oo\n\
         4711:C 01 Jan 2025 * Valkey version=8.0.1, bits=64, commit=00000000, modified=0, pid=4711, just started\n",
    );
    let watcher = watcher(&logs);
    let pattern = Regex::new(PID_LINE_PATTERN).unwrap();

    let found = watcher
        .wait_for_pattern(&log_path(), &pattern, Duration::from_secs(1))
        .await
        .unwrap();

    assert_eq!(found.group(PID_LINE_GROUP), Some("4711"));
    assert!(found.line.contains("just started"));
    assert_eq!(found.group(7), None);
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_any_prefers_earlier_literal() {
    let logs = Arc::new(MemoryLogSource::new());
    logs.set(
        &log_path(),
        "* Ready to accept connections tcp\n# bind: Address already in use\n",
    );
    let watcher = watcher(&logs);
    let literals = vec![
        "Address already in use".to_string(),
        "Address in use".to_string(),
        "Ready".to_string(),
    ];

    let index = watcher.wait_for_any(&log_path(), &literals, Duration::from_secs(1)).await;

    assert_eq!(index, Some(0));
}

#[tokio::test(start_paused = true)]
async fn test_unreadable_file_is_retried_until_timeout() {
    let mut source = MockLogSource::new();
    source
        .expect_read()
        .returning(|_| Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied")));
    let watcher = LogWatcher::new(Arc::new(source), INTERVAL);

    let found = watcher
        .wait_for_any(&log_path(), &["Ready".to_string()], Duration::from_millis(500))
        .await;

    assert_eq!(found, None);
}
