use std::{collections::BTreeMap, path::PathBuf};

use frostvault::{
    snapshot::{fingerprint, SnapshotStore},
    utils::StorageLayout,
};
use tempfile::TempDir;
use tokio::fs;

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[test_log::test(tokio::test)]
async fn test_capture_restore_round_trip_is_idempotent() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let layout = StorageLayout::new(temp_dir.path().join("base"));
    let domain = temp_dir.path().join("live");
    fs::create_dir_all(domain.join("etc/app")).await?;
    fs::write(domain.join("etc/app/app.conf"), b"port=80\n").await?;
    fs::write(domain.join("motd"), b"hello\n").await?;

    let paths = BTreeMap::from([("sys".to_string(), domain.clone())]);
    let mut store = SnapshotStore::open(layout.clone()).await?;
    let snapshot = store.capture("base", &paths, "").await?;
    let captured = snapshot.get_fingerprints()["sys"].clone();
    assert_eq!(fingerprint(&domain).await?, captured);

    fs::write(domain.join("etc/app/app.conf"), b"port=8080\n").await?;
    fs::write(domain.join("extra"), b"junk").await?;
    fs::remove_file(domain.join("motd")).await?;
    assert_ne!(fingerprint(&domain).await?, captured);

    for _ in 0..2 {
        let report = store.restore(snapshot.get_id(), &paths).await?;
        assert!(report.is_success());
        assert_eq!(fingerprint(&domain).await?, captured);
    }

    // The index survives a reopen
    let reopened = SnapshotStore::open(layout).await?;
    assert_eq!(reopened.get_by_name("base"), Some(&snapshot));

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_failed_capture_registers_nothing() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let layout = StorageLayout::new(temp_dir.path().join("base"));

    let good = temp_dir.path().join("good");
    fs::create_dir_all(&good).await?;
    fs::write(good.join("file"), b"data").await?;

    // A regular file where a directory tree is expected fails the copy
    let broken = temp_dir.path().join("broken");
    fs::write(&broken, b"not a directory").await?;

    let paths: BTreeMap<String, PathBuf> = BTreeMap::from([
        ("cfg".to_string(), good),
        ("zz-broken".to_string(), broken),
    ]);

    let mut store = SnapshotStore::open(layout.clone()).await?;
    assert!(store.capture("base", &paths, "").await.is_err());
    assert!(store.list().is_empty());

    let mut entries = fs::read_dir(layout.snapshots_dir()).await?;
    assert!(entries.next_entry().await?.is_none());

    let reopened = SnapshotStore::open(layout).await?;
    assert!(reopened.is_empty());

    Ok(())
}
