use std::sync::Arc;

use frostvault::{
    freeze::{BootOutcome, ConfigCommit, FreezeOrchestrator, InitOutcome, RestoreTarget},
    mount::RedirectMounter,
    vcs::CommitOutcome,
    FrostvaultError,
};
use tempfile::TempDir;
use tokio::fs;

use super::initialized_orchestrator;

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[test_log::test(tokio::test)]
async fn test_restore_base_removes_later_files() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let mut orchestrator = initialized_orchestrator(temp_dir.path()).await?;
    let sys = orchestrator.get_layout().domain_dir("sys");

    fs::write(sys.join("file1.txt"), b"one").await?;
    let base = orchestrator.create_snapshot("base", "").await?;
    let base_id = base.get_snapshot().get_id().clone();

    fs::write(sys.join("file2.txt"), b"two").await?;
    let modified = orchestrator.create_snapshot("modified", "").await?;
    assert_ne!(
        base.get_snapshot().get_fingerprints()["sys"],
        modified.get_snapshot().get_fingerprints()["sys"]
    );

    let report = orchestrator
        .restore_snapshot(RestoreTarget::Snapshot(base_id))
        .await?;

    assert!(report.is_success());
    assert_eq!(fs::read(sys.join("file1.txt")).await?, b"one");
    assert!(!sys.join("file2.txt").exists());

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_thaw_skips_boot_restore_and_freeze_resumes_it() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let mut orchestrator = initialized_orchestrator(temp_dir.path()).await?;
    let cfg = orchestrator.get_layout().domain_dir("cfg");

    fs::write(cfg.join("settings.conf"), b"mode=clean\n").await?;
    orchestrator.create_snapshot("clean", "known good").await?;
    orchestrator.set_default_snapshot("clean").await?;

    orchestrator.thaw().await?;
    fs::write(cfg.join("settings.conf"), b"mode=dirty\n").await?;
    assert_eq!(orchestrator.boot_restore().await?, BootOutcome::SkippedThawed);
    assert_eq!(fs::read(cfg.join("settings.conf")).await?, b"mode=dirty\n");

    // The flag survives a reload
    let mut reopened =
        FreezeOrchestrator::open(temp_dir.path()).await?.with_mounter(Arc::new(RedirectMounter::new()));
    assert!(reopened.get_state().is_thawed());

    reopened.freeze().await?;
    match reopened.boot_restore().await? {
        BootOutcome::Restored { report } => assert!(report.is_success()),
        other => panic!("expected a restore, got {:?}", other),
    }
    assert_eq!(fs::read(cfg.join("settings.conf")).await?, b"mode=clean\n");

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_unknown_default_keeps_previous_default() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let mut orchestrator = initialized_orchestrator(temp_dir.path()).await?;

    let created = orchestrator.create_snapshot("base", "").await?;
    let id = created.get_snapshot().get_id().clone();
    orchestrator.set_default_snapshot(&id).await?;

    assert!(matches!(
        orchestrator.set_default_snapshot("unknown-id").await,
        Err(FrostvaultError::SnapshotNotFound(_))
    ));

    let reopened = FreezeOrchestrator::open(temp_dir.path()).await?;
    let default = reopened.get_snapshots().default_snapshot().map(|s| s.get_id().clone());
    assert_eq!(default, Some(id));

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_operations_before_init_fail() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;

    assert!(matches!(
        FreezeOrchestrator::open(temp_dir.path()).await,
        Err(FrostvaultError::NotInitialized(_))
    ));

    let mut orchestrator = FreezeOrchestrator::new(temp_dir.path());
    assert!(matches!(
        orchestrator.create_snapshot("base", "").await,
        Err(FrostvaultError::NotInitialized(_))
    ));
    assert!(matches!(
        orchestrator.thaw().await,
        Err(FrostvaultError::NotInitialized(_))
    ));

    assert_eq!(orchestrator.init().await?, InitOutcome::Initialized);
    assert_eq!(orchestrator.init().await?, InitOutcome::AlreadyInitialized);

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_config_history_follows_snapshots_and_commits() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let mut orchestrator = initialized_orchestrator(temp_dir.path()).await?;
    let cfg = orchestrator.get_layout().domain_dir("cfg");

    fs::write(cfg.join("network.conf"), b"dhcp\n").await?;
    let created = orchestrator.create_snapshot("net", "").await?;
    assert!(matches!(
        created.get_config_commit(),
        ConfigCommit::Committed { .. }
    ));

    fs::write(cfg.join("network.conf"), b"static\n").await?;
    assert!(matches!(
        orchestrator.commit_config("switch to static").await?,
        CommitOutcome::Committed { .. }
    ));
    assert_eq!(
        orchestrator.commit_config("again").await?,
        CommitOutcome::NothingToCommit
    );

    orchestrator.tag_config("v1", "first release").await?;
    assert!(matches!(
        orchestrator.tag_config("v1", "").await,
        Err(FrostvaultError::TagExists(_))
    ));

    let summaries: Vec<_> = orchestrator
        .config_history(10)
        .await?
        .into_iter()
        .map(|entry| entry.summary)
        .collect();
    assert_eq!(summaries.len(), 3);
    assert_eq!(summaries[0], "switch to static");
    assert_eq!(summaries[1], "Snapshot: net");

    let status = orchestrator.config_status().await?;
    assert!(status.clean);

    Ok(())
}
