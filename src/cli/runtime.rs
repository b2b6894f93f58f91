use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::fusion::WeightingPolicy;

/// Period tracking and probability fusion for the 14-match pool.
#[derive(Parser, Debug)]
#[command(name = "poolcast")]
#[command(version = "0.1.0")]
#[command(
    about = "Track the on-sale betting period and fuse per-match probability estimates",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config directory (default.toml, $POOLCAST_ENV.toml)
    #[arg(short, long, default_value = "config")]
    pub config: String,

    /// Override the storage root directory
    #[arg(long)]
    pub root: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect a new period. Exits 0 when nothing changed, non-zero when a new period is on sale
    Check {
        /// Use this period token instead of asking the provider
        #[arg(long)]
        period: Option<String>,
        /// Exit code reported for a new period (1 or 2; default from config)
        #[arg(long)]
        exit_code: Option<i32>,
    },

    /// Print the period currently on sale
    Current,

    /// Print the match listing of a period
    Listing {
        /// Period number (default: current period)
        #[arg(long)]
        period: Option<String>,
    },

    /// Fuse basic and advanced estimates for a period
    Fuse {
        /// Period number (default: last recorded, then latest on disk)
        #[arg(long)]
        period: Option<String>,
        /// Weighting policy: discounted_basic | unweighted_sum
        #[arg(short, long)]
        weighting: Option<WeightingPolicy>,
        /// Factor applied to the basic source under discounted_basic
        #[arg(long)]
        discount: Option<f64>,
    },

    /// Score common-opponent strength from a period's head-to-head history
    Strength {
        /// Period number (default: last recorded, then latest on disk)
        #[arg(long)]
        period: Option<String>,
        /// Reference date for the time decay, YYYY-MM-DD (default: today)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Show recorded period observations
    Log {
        /// Number of most recent entries to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}
