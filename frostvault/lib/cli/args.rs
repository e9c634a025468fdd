use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::styles;

//-------------------------------------------------------------------------------------------------
// Types
//-------------------------------------------------------------------------------------------------

/// frostvault - keep frozen storage domains restorable to a known-clean state
#[derive(Debug, Parser)]
#[command(name = "frostvault", author, about, version, styles=styles::styles())]
pub struct FrostvaultArgs {
    /// The subcommand to run
    #[command(subcommand)]
    pub subcommand: Option<FrostvaultSubcommand>,

    /// Base storage path. Defaults to $FROSTVAULT_HOME, then ~/.frostvault
    #[arg(short, long, global = true, value_name = "PATH")]
    pub base_path: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available subcommands
#[derive(Debug, Subcommand)]
pub enum FrostvaultSubcommand {
    /// Initialize base storage and the default domains
    #[command(name = "init")]
    Init,

    /// Create, list or remove snapshots
    #[command(subcommand)]
    Snapshot(SnapshotSubcommand),

    /// Set the snapshot restored at boot
    #[command(name = "set-default")]
    SetDefault {
        /// Id or name of the snapshot
        #[arg(required = true)]
        snapshot: String,
    },

    /// Restore the frozen domains from a snapshot
    #[command(name = "restore")]
    Restore {
        /// Id or name of the snapshot
        #[arg(required_unless_present = "default", conflicts_with = "default")]
        snapshot: Option<String>,

        /// Restore the default snapshot
        #[arg(short, long)]
        default: bool,
    },

    /// Show domains, snapshots and the freeze flag
    #[command(name = "status")]
    Status {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Commit changes in the config domain
    #[command(name = "commit")]
    Commit {
        /// Commit message
        #[arg(short, long, required = true)]
        message: String,
    },

    /// Tag the current config commit
    #[command(name = "tag")]
    Tag {
        /// Tag name
        #[arg(required = true)]
        name: String,

        /// Annotation message. An empty message makes a lightweight tag
        #[arg(short, long, default_value = "")]
        message: String,
    },

    /// Show config history
    #[command(name = "history")]
    History {
        /// Maximum number of commits to show
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
    },

    /// Suspend protection so boot restores are skipped
    #[command(name = "thaw")]
    Thaw,

    /// Resume protection
    #[command(name = "freeze")]
    Freeze,

    /// Restore the default snapshot unless thawed. Invoked by boot services
    #[command(name = "boot-restore")]
    BootRestore,

    /// Expose the frozen domains at their view paths
    #[command(name = "present")]
    Present,

    /// Tear down the views of the frozen domains
    #[command(name = "withdraw")]
    Withdraw,
}

/// Snapshot management subcommands
#[derive(Debug, Subcommand)]
pub enum SnapshotSubcommand {
    /// Capture the frozen domains
    #[command(name = "create")]
    Create {
        /// Snapshot label
        #[arg(required = true)]
        name: String,

        /// Free-form description
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// List snapshots, oldest first
    #[command(name = "list")]
    List {
        /// Print the list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove a snapshot and its stored copy
    #[command(name = "remove")]
    Remove {
        /// Id or name of the snapshot
        #[arg(required = true)]
        snapshot: String,
    },
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
