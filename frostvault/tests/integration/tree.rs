use frostvault::tree::{copy_tree, CopyOptions, CopyStrategy};
use tempfile::TempDir;
use tokio::fs;

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[test_log::test(tokio::test)]
async fn test_copy_tree_skips_vcs_metadata() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let source = temp_dir.path().join("source");
    let target = temp_dir.path().join("target");

    fs::create_dir_all(source.join(".git/objects")).await?;
    fs::write(source.join(".git/HEAD"), b"ref: refs/heads/main\n").await?;
    fs::create_dir_all(source.join("nested/deeper")).await?;
    fs::write(source.join("top.txt"), b"top").await?;
    fs::write(source.join("nested/deeper/leaf.txt"), b"leaf").await?;

    let options = CopyOptions::builder()
        .skip_vcs_metadata(true)
        .strategy(CopyStrategy::Copy)
        .build();
    let stats = copy_tree(&source, &target, &options).await?;

    assert!(!target.join(".git").exists());
    assert_eq!(fs::read(target.join("top.txt")).await?, b"top");
    assert_eq!(fs::read(target.join("nested/deeper/leaf.txt")).await?, b"leaf");
    assert_eq!(stats.copied, 2);
    assert_eq!(stats.linked, 0);

    Ok(())
}
