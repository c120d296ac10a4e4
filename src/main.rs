mod batch;
mod cli;
mod commands;
mod config;
mod customsearch;
mod report;
mod usage;

pub const USER_AGENT: &str = concat!("indexcheck/", env!("CARGO_PKG_VERSION"));

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use tracing::{info, warn};

use cli::{Cli, Command};
use config::Config;
use usage::UsageStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let directive = if cli.verbose {
        "indexcheck=debug"
    } else {
        "indexcheck=info"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(directive.parse()?),
        )
        .init();

    let mut config = Config::from_env()?;
    cli.apply_to(&mut config);

    match &cli.command {
        Command::Usage => {
            let store = UsageStore::new(&config.usage_path);
            let status = commands::usage_status(&store, config.daily_quota);
            print!(
                "{}",
                report::format_usage(&status.record, status.source, status.quota, store.path())
            );
        }
        Command::Reset => {
            let store = UsageStore::new(&config.usage_path);
            let status = commands::reset_usage(&store, config.daily_quota)
                .inspect_err(|e| tracing::error!("reset failed: {e}"))?;
            println!("Counter reset successfully.");
            print!(
                "{}",
                report::format_usage(&status.record, status.source, status.quota, store.path())
            );
        }
        Command::Check { input, output, .. } => {
            let stop = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&stop);
            tokio::spawn(async move {
                while tokio::signal::ctrl_c().await.is_ok() {
                    if !request_stop(&flag) {
                        warn!("second interrupt, aborting");
                        std::process::exit(130);
                    }
                    warn!("interrupt received, stopping after the current URL");
                }
            });

            let outcome = commands::check_file(&config, input, output, Some(stop.as_ref()), |p| {
                if let Some(status) = p.status {
                    eprintln!("Checking ({}/{}): {} -> {status}", p.index, p.total, p.url);
                }
            })
            .await
            .inspect_err(|e| tracing::error!("check failed: {e}"))?;

            println!("{}", report::format_results(&outcome.result.table));
            println!("{}", report::format_breakdown(&outcome.result.tally));
            print!("{}", report::format_summary(&outcome, config.daily_quota));
            println!("Results written to {}", output.display());
            info!(
                indexed = outcome.result.tally.indexed,
                not_indexed = outcome.result.tally.not_indexed,
                error = outcome.result.tally.error,
                "done"
            );
        }
    }

    Ok(())
}

/// Raise the stop flag. Returns `false` when it was already raised, meaning the
/// user asked twice and the process should exit without waiting.
fn request_stop(flag: &AtomicBool) -> bool {
    !flag.swap(true, Ordering::Relaxed)
}
