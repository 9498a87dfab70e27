//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Pomodoro timer with usage reports.
///
/// Runs focus and break intervals, remembers every session, and
/// summarises how time was spent per day.
#[derive(Debug, Parser)]
#[command(name = "pomo", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the next interval, or resume a paused one. Ctrl-C cancels it.
    Start,

    /// Pause the running interval.
    Pause,

    /// Cancel the unfinished interval.
    Cancel,

    /// Show the most recent interval.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show focus and break time for one day.
    Summary {
        /// Day to summarise (YYYY-MM-DD), defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Show daily focus and break time over several days.
    Report {
        /// Number of days to include.
        #[arg(long, default_value_t = 7)]
        days: usize,

        /// Most recent day of the report (YYYY-MM-DD), defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}
