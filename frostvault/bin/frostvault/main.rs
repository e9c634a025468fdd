#[path = "mod.rs"]
mod internal;

use clap::{CommandFactory, Parser};
use frostvault::{
    cli::{FrostvaultArgs, FrostvaultSubcommand, SnapshotSubcommand},
    FrostvaultResult,
};
use internal::handlers;
use tracing_subscriber::EnvFilter;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

const DEFAULT_LOG_FILTER: &str = "info";
const VERBOSE_LOG_FILTER: &str = "debug";

//--------------------------------------------------------------------------------------------------
// Functions: main
//--------------------------------------------------------------------------------------------------

#[tokio::main]
async fn main() -> FrostvaultResult<()> {
    let args = FrostvaultArgs::parse();

    // RUST_LOG wins over the verbosity flag
    let fallback = if args.verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let base_path = args.base_path;
    match args.subcommand {
        Some(FrostvaultSubcommand::Init) => {
            handlers::init_subcommand(base_path).await?;
        }
        Some(FrostvaultSubcommand::Snapshot(subcommand)) => match subcommand {
            SnapshotSubcommand::Create { name, description } => {
                handlers::snapshot_create_subcommand(base_path, name, description).await?;
            }
            SnapshotSubcommand::List { json } => {
                handlers::snapshot_list_subcommand(base_path, json).await?;
            }
            SnapshotSubcommand::Remove { snapshot } => {
                handlers::snapshot_remove_subcommand(base_path, snapshot).await?;
            }
        },
        Some(FrostvaultSubcommand::SetDefault { snapshot }) => {
            handlers::set_default_subcommand(base_path, snapshot).await?;
        }
        Some(FrostvaultSubcommand::Restore { snapshot, default }) => {
            handlers::restore_subcommand(base_path, snapshot, default).await?;
        }
        Some(FrostvaultSubcommand::Status { json }) => {
            handlers::status_subcommand(base_path, json).await?;
        }
        Some(FrostvaultSubcommand::Commit { message }) => {
            handlers::commit_subcommand(base_path, message).await?;
        }
        Some(FrostvaultSubcommand::Tag { name, message }) => {
            handlers::tag_subcommand(base_path, name, message).await?;
        }
        Some(FrostvaultSubcommand::History { count }) => {
            handlers::history_subcommand(base_path, count).await?;
        }
        Some(FrostvaultSubcommand::Thaw) => {
            handlers::thaw_subcommand(base_path).await?;
        }
        Some(FrostvaultSubcommand::Freeze) => {
            handlers::freeze_subcommand(base_path).await?;
        }
        Some(FrostvaultSubcommand::BootRestore) => {
            handlers::boot_restore_subcommand(base_path).await?;
        }
        Some(FrostvaultSubcommand::Present) => {
            handlers::present_subcommand(base_path).await?;
        }
        Some(FrostvaultSubcommand::Withdraw) => {
            handlers::withdraw_subcommand(base_path).await?;
        }
        None => {
            FrostvaultArgs::command().print_help()?;
        }
    }

    Ok(())
}
