use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::report::DEFAULT_REPORT_FILE;

#[derive(Parser, Debug)]
#[command(
    name = "indexcheck",
    about = "Check whether the URLs in a CSV file are indexed, via the Google Custom Search JSON API",
    version,
    long_about = None
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the daily usage counter file
    #[arg(long, global = true, value_name = "PATH")]
    pub usage_file: Option<PathBuf>,

    /// Calls allowed per calendar day
    #[arg(long, global = true)]
    pub quota: Option<u32>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check every URL in the first column of a CSV file
    Check {
        /// CSV file with a header row; the first column holds the URLs
        input: PathBuf,

        /// Where to write the augmented CSV
        #[arg(short, long, default_value = DEFAULT_REPORT_FILE)]
        output: PathBuf,

        /// Pause between API calls, in milliseconds
        #[arg(long, conflicts_with = "no_delay")]
        delay_ms: Option<u64>,

        /// Do not pause between API calls
        #[arg(long)]
        no_delay: bool,
    },
    /// Show today's API usage
    Usage,
    /// Reset today's API usage counter to zero
    Reset,
}

impl Cli {
    /// Apply command-line overrides on top of the environment configuration.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(ref path) = self.usage_file {
            config.usage_path = path.clone();
        }
        if let Some(quota) = self.quota {
            config.daily_quota = quota;
        }
        if let Command::Check {
            delay_ms, no_delay, ..
        } = &self.command
        {
            if *no_delay {
                config.call_delay = Duration::ZERO;
            } else if let Some(ms) = delay_ms {
                config.call_delay = Duration::from_millis(*ms);
            }
        }
    }
}
