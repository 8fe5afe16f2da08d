use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use cluster_manager::Binaries;
use cluster_manager::ClusterOrchestrator;
use cluster_manager::ClusterState;
use cluster_manager::ClusterWorkspace;
use cluster_manager::FsLogSource;
use cluster_manager::Settings;
use cluster_manager::StopRequest;
use cluster_manager::StopTarget;
use cluster_manager::TokioCommandRunner;
use tempfile::tempdir;

fn orchestrator(home: &Path) -> ClusterOrchestrator {
    let mut settings = Settings::default();
    settings.paths.home_dir = home.to_path_buf();
    // no node folders: neither binary is ever run
    ClusterOrchestrator::new(
        settings,
        Arc::new(TokioCommandRunner),
        Arc::new(FsLogSource),
        Binaries::new("valkey-server", "valkey-cli"),
    )
}

fn request(target: StopTarget) -> StopRequest {
    StopRequest {
        host: "127.0.0.1".into(),
        target,
        tls: false,
        credentials: None,
        keep_folder: false,
        pids: vec![],
    }
}

#[tokio::test]
async fn test_stop_removes_workspace_without_nodes() {
    let home = tempdir().unwrap();
    let root = home.path().join("clusters");
    let workspace = ClusterWorkspace::create(&root, "cluster", Utc::now()).unwrap();
    std::fs::write(workspace.log_file(), "previous run").unwrap();
    let mut orchestrator = orchestrator(home.path());

    let report = orchestrator
        .stop(&request(StopTarget::Folder(workspace.path().to_path_buf())))
        .await
        .unwrap();

    assert!(report.all_graceful());
    assert!(report.stopped.is_empty());
    assert!(!workspace.path().exists());
    assert_eq!(orchestrator.state(), ClusterState::Stopped);
}

#[tokio::test]
async fn test_stop_by_prefix_kills_listed_pids() {
    let home = tempdir().unwrap();
    let root = home.path().join("clusters");
    let kept = ClusterWorkspace::create(&root, "tls-cluster", Utc::now()).unwrap();
    let mut sleeper = std::process::Command::new("sleep").arg("30").spawn().unwrap();
    let pid = sleeper.id();

    let mut stop = request(StopTarget::Prefix {
        root: root.clone(),
        prefix: "tls-cluster".into(),
    });
    stop.keep_folder = true;
    stop.pids = vec![pid];
    let report = orchestrator(home.path()).stop(&stop).await.unwrap();

    assert_eq!(report.killed, vec![pid]);
    assert!(report.removed_folders.is_empty());
    assert!(kept.path().is_dir());
    let status = sleeper.wait().unwrap();
    assert_eq!(status.signal(), Some(9));
}

#[tokio::test]
async fn test_stop_of_missing_folder_is_rejected() {
    let home = tempdir().unwrap();
    let mut orchestrator = orchestrator(home.path());

    let result = orchestrator
        .stop(&request(StopTarget::Folder(home.path().join("gone"))))
        .await;

    assert!(result.is_err());
    assert_eq!(orchestrator.state(), ClusterState::Failed);
}
