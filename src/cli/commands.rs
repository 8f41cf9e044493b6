//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: start the reminder daemon over a tasks file
//! - plan: show each task's next occurrence and planned alerts
//! - stats: show habit streaks and goal percentages

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Remindr - a recurring reminder daemon with habit analytics
#[derive(Parser, Debug)]
#[command(name = "remindr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose > 0
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the reminder daemon until interrupted
    Run {
        /// Tasks file to schedule from (overrides config)
        #[arg(short, long)]
        tasks: Option<PathBuf>,

        /// Seconds between heartbeat re-syncs (overrides config)
        #[arg(short, long)]
        interval_secs: Option<u64>,
    },

    /// Show each task's next occurrence and the alerts that would arm
    Plan {
        /// Tasks file to read (overrides config)
        #[arg(short, long)]
        tasks: Option<PathBuf>,
    },

    /// Show habit streaks, logged minutes, and goal percentages
    Stats {
        /// Tasks file to read (overrides config)
        #[arg(short, long)]
        tasks: Option<PathBuf>,
    },
}
