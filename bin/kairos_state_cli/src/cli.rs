//! CLI argument parsing for kairos-state

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// YAML document (default)
    #[default]
    Yaml,
    /// Pretty-printed JSON
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "kairos-state")]
#[command(about = "Boot mode and partition runtime snapshot")]
#[command(long_about = "Boot mode and partition runtime snapshot\n\n\
    Classifies the current boot slot and locates the persistent, recovery, OEM and\n\
    state partitions, then prints the snapshot or answers a jq-style query about it.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Read /proc, /sys, /run and /etc under this directory instead of /
    ///
    /// The findmnt/lsblk fallbacks and the CPU, memory and OS facts still come from the
    /// live host.
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the full snapshot
    Show {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        output: OutputFormat,
    },

    /// Evaluate a query such as `kairos.version` or `oem.mount_point`
    Get {
        /// jq-style expression; the leading `.` is optional
        query: String,
    },
}
