//! One handler per user action. Each takes the current state, performs the
//! action (persisting where needed) and returns an outcome for `main` to render.

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use reqwest::Client;
use tracing::{info, warn};

use crate::batch::{
    BatchOptions, BatchOutcome, FixedDelay, Pacer, Progress, TableError, UrlTable, run_batch,
};
use crate::config::{Config, ConfigError};
use crate::customsearch::{CustomSearchClient, IndexChecker};
use crate::report;
use crate::usage::{LoadSource, UsageError, UsageRecord, UsageStore};

/// TCP connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct UsageStatus {
    pub record: UsageRecord,
    pub source: LoadSource,
    pub quota: u32,
}

pub fn usage_status(store: &UsageStore, quota: u32) -> UsageStatus {
    let loaded = store.load_report();
    UsageStatus {
        record: loaded.record,
        source: loaded.source,
        quota,
    }
}

pub fn reset_usage(store: &UsageStore, quota: u32) -> Result<UsageStatus, CommandError> {
    let record = store.reset()?;
    info!(path = %store.path().display(), "usage counter reset");
    Ok(UsageStatus {
        record,
        source: LoadSource::Stored,
        quota,
    })
}

/// Run a batch over an already-loaded table.
///
/// An already exhausted quota is not an error: no calls are made and every
/// row with a URL is reported as skipped.
pub async fn check_table<C, P>(
    table: UrlTable,
    checker: &C,
    store: &UsageStore,
    options: &BatchOptions<'_, P>,
    on_progress: impl FnMut(Progress<'_>),
) -> Result<BatchOutcome, CommandError>
where
    C: IndexChecker,
    P: Pacer,
{
    let usage = store.load();
    if usage.is_exhausted(options.quota) {
        info!(
            quota = options.quota,
            count = usage.count,
            "daily quota already used up, no calls will be made"
        );
    }

    if table.is_empty() {
        warn!("input table has no rows");
    }
    info!(
        column = table.url_header(),
        rows = table.len(),
        urls = table.url_count(),
        remaining = usage.remaining(options.quota),
        "starting index check (first column is the URL column)"
    );

    Ok(run_batch(table, checker, store, usage, options, on_progress).await)
}

/// Read `input`, check every URL against the search API and write the
/// augmented table to `output`.
pub async fn check_file(
    config: &Config,
    input: &Path,
    output: &Path,
    stop: Option<&AtomicBool>,
    on_progress: impl FnMut(Progress<'_>),
) -> Result<BatchOutcome, CommandError> {
    let credentials = config.credentials()?;
    let table = UrlTable::from_path(input)?;

    let http = Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(HTTP_TIMEOUT)
        .build()?;
    let client = CustomSearchClient::new(http, credentials);
    let store = UsageStore::new(&config.usage_path);
    let pacer = FixedDelay(config.call_delay);
    let options = BatchOptions {
        quota: config.daily_quota,
        pacer: &pacer,
        stop,
    };

    let outcome = check_table(table, &client, &store, &options, on_progress).await?;

    report::write_csv_file(&outcome.result.table, output)?;
    info!(path = %output.display(), "results written");
    Ok(outcome)
}
