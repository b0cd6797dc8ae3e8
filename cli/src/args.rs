//! Command line flags

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lotto_core::Interval;

const DEFAULT_CONFIG: &str = "config/lottery.toml";

#[derive(Parser, Debug)]
#[command(name = "lottod")]
#[command(about = "Guild treasury lottery daemon", version)]
pub struct DaemonArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Overrides storage.data_dir
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(name = "lotto-cli")]
#[command(about = "Guild lottery operator tool", version)]
pub struct OperatorArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Overrides storage.data_dir
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: OperatorCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    /// Current interval, phase and pot
    Status,

    /// Sync and run the draw if the cashout has passed
    Draw,

    /// Post a fresh board and track it from now on
    Repost,

    /// Replay a persisted draw from its seed
    Verify {
        /// Interval key, e.g. 2024-05
        interval: Interval,
    },

    /// Print a persisted draw
    Show {
        /// Interval key, e.g. 2024-05
        interval: Interval,
    },

    /// List every drawn interval
    History,
}
