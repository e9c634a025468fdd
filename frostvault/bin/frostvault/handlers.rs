use std::path::PathBuf;

use frostvault::{
    cli::AnsiStyles,
    config,
    freeze::{BootOutcome, ConfigCommit, FreezeOrchestrator, InitOutcome, RestoreTarget, StatusReport},
    snapshot::{DomainRestore, RestoreReport, Snapshot},
    vcs::CommitOutcome,
    FrostvaultResult,
};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

//--------------------------------------------------------------------------------------------------
// Functions: Handlers
//--------------------------------------------------------------------------------------------------

pub async fn init_subcommand(base_path: Option<PathBuf>) -> FrostvaultResult<()> {
    let base = resolve_base_path(base_path)?;
    let mut orchestrator = FreezeOrchestrator::new(&base);

    match orchestrator.init().await? {
        InitOutcome::Initialized => {
            println!("{} {}", "initialized".valid(), orchestrator.base().display());
        }
        InitOutcome::AlreadyInitialized => {
            println!(
                "{} {}",
                "already initialized".literal(),
                orchestrator.base().display()
            );
        }
    }

    for domain in orchestrator.get_registry().domains() {
        println!(
            "  {:<8} {:<10} {}",
            domain.get_kind().to_string().literal(),
            domain.get_reset_policy().to_string(),
            domain.get_path().display()
        );
    }

    Ok(())
}

pub async fn snapshot_create_subcommand(
    base_path: Option<PathBuf>,
    name: String,
    description: String,
) -> FrostvaultResult<()> {
    let mut orchestrator = open_orchestrator(base_path).await?;
    let created = orchestrator.create_snapshot(&name, &description).await?;
    let snapshot = created.get_snapshot();

    println!(
        "{} {} {}",
        "created snapshot".valid(),
        snapshot.get_id().literal(),
        format!("({})", snapshot.get_name()).placeholder()
    );

    match created.get_config_commit() {
        ConfigCommit::Committed { id } => println!("  config committed as {}", id.literal()),
        ConfigCommit::Unchanged => println!("  config unchanged"),
        ConfigCommit::Failed { reason } => {
            println!("  {} {}", "config commit failed:".error(), reason)
        }
        ConfigCommit::Skipped => {}
    }

    Ok(())
}

pub async fn snapshot_list_subcommand(base_path: Option<PathBuf>, json: bool) -> FrostvaultResult<()> {
    let orchestrator = open_orchestrator(base_path).await?;
    let snapshots = orchestrator.list_snapshots()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshots)?);
        return Ok(());
    }

    if snapshots.is_empty() {
        println!("no snapshots");
        return Ok(());
    }

    let default_id = orchestrator
        .get_snapshots()
        .default_snapshot()
        .map(|s| s.get_id().clone());

    println!("{}", format!("{:<18}{:<20}{:<21}DOMAINS", "ID", "NAME", "CREATED").header());
    for snapshot in snapshots {
        let marker = if default_id.as_deref() == Some(snapshot.get_id().as_str()) {
            " (default)".valid()
        } else {
            String::new()
        };
        println!("{}{}", snapshot_row(snapshot), marker);
    }

    Ok(())
}

pub async fn snapshot_remove_subcommand(
    base_path: Option<PathBuf>,
    snapshot: String,
) -> FrostvaultResult<()> {
    let mut orchestrator = open_orchestrator(base_path).await?;
    let removed = orchestrator.remove_snapshot(&snapshot).await?;
    println!(
        "{} {} {}",
        "removed snapshot".valid(),
        removed.get_id().literal(),
        format!("({})", removed.get_name()).placeholder()
    );
    Ok(())
}

pub async fn set_default_subcommand(
    base_path: Option<PathBuf>,
    snapshot: String,
) -> FrostvaultResult<()> {
    let mut orchestrator = open_orchestrator(base_path).await?;
    orchestrator.set_default_snapshot(&snapshot).await?;

    if let Some(default) = orchestrator.get_snapshots().default_snapshot() {
        println!(
            "{} {} {}",
            "default snapshot is now".valid(),
            default.get_id().literal(),
            format!("({})", default.get_name()).placeholder()
        );
    }

    Ok(())
}

pub async fn restore_subcommand(
    base_path: Option<PathBuf>,
    snapshot: Option<String>,
    default: bool,
) -> FrostvaultResult<()> {
    let target = match snapshot {
        Some(snapshot) if !default => RestoreTarget::Snapshot(snapshot),
        _ => RestoreTarget::Default,
    };

    let mut orchestrator = open_orchestrator(base_path).await?;
    let report = orchestrator.restore_snapshot(target).await?;
    print_restore_report(&report);
    report.into_result()?;

    Ok(())
}

pub async fn status_subcommand(base_path: Option<PathBuf>, json: bool) -> FrostvaultResult<()> {
    let mut orchestrator = open_orchestrator(base_path).await?;
    let report = orchestrator.status().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_status_report(&report);
    }

    Ok(())
}

pub async fn commit_subcommand(base_path: Option<PathBuf>, message: String) -> FrostvaultResult<()> {
    let orchestrator = open_orchestrator(base_path).await?;
    match orchestrator.commit_config(&message).await? {
        CommitOutcome::Committed { id } => println!("{} {}", "committed".valid(), id.literal()),
        CommitOutcome::NothingToCommit => println!("nothing to commit"),
    }
    Ok(())
}

pub async fn tag_subcommand(
    base_path: Option<PathBuf>,
    name: String,
    message: String,
) -> FrostvaultResult<()> {
    let orchestrator = open_orchestrator(base_path).await?;
    orchestrator.tag_config(&name, &message).await?;
    println!("{} {}", "tagged".valid(), name.literal());
    Ok(())
}

pub async fn history_subcommand(base_path: Option<PathBuf>, count: usize) -> FrostvaultResult<()> {
    let orchestrator = open_orchestrator(base_path).await?;
    for entry in orchestrator.config_history(count).await? {
        println!(
            "{} {} {} {}",
            entry.id.literal(),
            entry.time.format(TIME_FORMAT),
            format!("<{}>", entry.author).placeholder(),
            entry.summary
        );
    }
    Ok(())
}

pub async fn thaw_subcommand(base_path: Option<PathBuf>) -> FrostvaultResult<()> {
    let mut orchestrator = open_orchestrator(base_path).await?;
    orchestrator.thaw().await?;
    println!("{} boot restores will be skipped", "thawed:".valid());
    Ok(())
}

pub async fn freeze_subcommand(base_path: Option<PathBuf>) -> FrostvaultResult<()> {
    let mut orchestrator = open_orchestrator(base_path).await?;
    orchestrator.freeze().await?;
    println!("{} boot restores are active", "frozen:".valid());
    Ok(())
}

pub async fn boot_restore_subcommand(base_path: Option<PathBuf>) -> FrostvaultResult<()> {
    let mut orchestrator = open_orchestrator(base_path).await?;
    match orchestrator.boot_restore().await? {
        BootOutcome::SkippedThawed => println!("thawed, nothing restored"),
        BootOutcome::NoDefault => println!("no default snapshot, nothing restored"),
        BootOutcome::Restored { report } => print_restore_report(&report),
    }
    Ok(())
}

pub async fn present_subcommand(base_path: Option<PathBuf>) -> FrostvaultResult<()> {
    let mut orchestrator = open_orchestrator(base_path).await?;
    for presentation in orchestrator.present_domains().await? {
        let fallback = if presentation.fallback {
            " (fallback)".placeholder()
        } else {
            String::new()
        };
        println!(
            "{:<8} {:<9} {}{}",
            presentation.domain.literal(),
            presentation.kind.to_string(),
            presentation.view.display(),
            fallback
        );
    }
    Ok(())
}

pub async fn withdraw_subcommand(base_path: Option<PathBuf>) -> FrostvaultResult<()> {
    let mut orchestrator = open_orchestrator(base_path).await?;
    let withdrawn = orchestrator.withdraw_domains().await?;
    if withdrawn.is_empty() {
        println!("nothing presented");
    }
    for (name, kind) in withdrawn {
        println!("{} {} ({})", "withdrew".valid(), name.literal(), kind);
    }
    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

fn resolve_base_path(base_path: Option<PathBuf>) -> FrostvaultResult<PathBuf> {
    match base_path {
        Some(path) => Ok(path),
        None => config::default_base_path(),
    }
}

async fn open_orchestrator(base_path: Option<PathBuf>) -> FrostvaultResult<FreezeOrchestrator> {
    FreezeOrchestrator::open(resolve_base_path(base_path)?).await
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

fn snapshot_row(snapshot: &Snapshot) -> String {
    format!(
        "{:<18}{:<20}{:<21}{}",
        snapshot.get_id(),
        snapshot.get_name(),
        snapshot.get_created_at().format(TIME_FORMAT),
        snapshot.domain_names().collect::<Vec<_>>().join(",")
    )
}

fn print_restore_report(report: &RestoreReport) {
    println!("snapshot {}", report.get_snapshot_id().literal());
    for (name, outcome) in report.get_domains() {
        match outcome {
            DomainRestore::Restored { entries } => {
                println!("  {:<8} {} ({} entries)", name, "restored".valid(), entries)
            }
            DomainRestore::Failed { reason } => {
                println!("  {:<8} {} {}", name, "failed:".error(), reason)
            }
        }
    }
}

fn print_status_report(report: &StatusReport) {
    println!("{}", "Storage".header());
    println!("  base path       {}", report.base_path.display());
    println!("  platform        {}", report.platform);
    println!("  mount strategy  {}", report.mount_strategy);
    let protection = if report.thawed {
        "thawed".error()
    } else {
        "frozen".valid()
    };
    println!("  protection      {}", protection);

    println!();
    println!("{}", "Domains".header());
    for domain in &report.domains {
        let presentation = domain
            .presentation
            .map(|kind| kind.to_string())
            .unwrap_or_else(|| "-".to_string());
        let exists = if domain.exists {
            String::new()
        } else {
            " (missing)".error()
        };
        println!(
            "  {:<8} {:<10} {:<9} {:>9} free  {}{}",
            domain.name.literal(),
            domain.reset_policy.to_string(),
            presentation,
            format_bytes(domain.disk_usage.free),
            domain.path.display(),
            exists
        );
    }

    println!();
    println!("{}", format!("Snapshots ({})", report.snapshot_count).header());
    match &report.default_snapshot {
        Some(default) => println!("  default         {} ({})", default.id.literal(), default.name),
        None => println!("  default         {}", "none".placeholder()),
    }
    for summary in &report.recent_snapshots {
        println!(
            "  {:<18}{:<20}{}",
            summary.id,
            summary.name,
            summary.created_at.format(TIME_FORMAT)
        );
    }

    if let Some(repository) = &report.config_repository {
        println!();
        println!("{}", "Config repository".header());
        println!(
            "  branch          {}",
            repository.branch.as_deref().unwrap_or("(detached)")
        );
        println!(
            "  head            {}",
            repository.head.as_deref().unwrap_or("(none)")
        );
        let state = if repository.clean {
            "clean".valid()
        } else {
            format!(
                "{} modified, {} untracked, {} staged",
                repository.modified.len(),
                repository.untracked.len(),
                repository.staged.len()
            )
            .error()
        };
        println!("  state           {}", state);
        for entry in &repository.history {
            println!("  {} {}", entry.id.literal(), entry.summary);
        }
    }
}
