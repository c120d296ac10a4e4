use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use super::pacing::Pacer;
use super::rows::UrlTable;
use crate::customsearch::{IndexChecker, IndexStatus};
use crate::usage::{UsageRecord, UsageStore};

pub struct BatchOptions<'a, P> {
    /// Calls allowed per calendar day.
    pub quota: u32,
    pub pacer: &'a P,
    /// Checked before each call, after pacing; set it to stop once the
    /// in-flight row finishes.
    pub stop: Option<&'a AtomicBool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub indexed: usize,
    pub not_indexed: usize,
    pub error: usize,
}

impl Tally {
    pub fn record(&mut self, status: IndexStatus) {
        match status {
            IndexStatus::Indexed => self.indexed += 1,
            IndexStatus::NotIndexed => self.not_indexed += 1,
            IndexStatus::Error => self.error += 1,
        }
    }

    pub fn get(&self, status: IndexStatus) -> usize {
        match status {
            IndexStatus::Indexed => self.indexed,
            IndexStatus::NotIndexed => self.not_indexed,
            IndexStatus::Error => self.error,
        }
    }

    pub fn total(&self) -> usize {
        self.indexed + self.not_indexed + self.error
    }
}

/// Processed rows plus per-status counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub table: UrlTable,
    pub tally: Tally,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Completed,
    QuotaExhausted,
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub result: BatchResult,
    pub stop: StopReason,
    /// Rows with a URL that were left unchecked.
    pub skipped: usize,
    /// Usage after the run, already persisted.
    pub usage: UsageRecord,
}

/// Reported once per input row, in order.
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    /// 1-based row position.
    pub index: usize,
    pub total: usize,
    pub url: &'a str,
    /// `None` for rows skipped because the URL cell was empty.
    pub status: Option<IndexStatus>,
}

/// Check every row of `table` in order, one call at a time.
///
/// Each call is charged to `usage` and persisted through `store` before the
/// next row starts, so a crash loses at most the in-flight call.
pub async fn run_batch<C, P>(
    mut table: UrlTable,
    checker: &C,
    store: &UsageStore,
    mut usage: UsageRecord,
    options: &BatchOptions<'_, P>,
    mut on_progress: impl FnMut(Progress<'_>),
) -> BatchOutcome
where
    C: IndexChecker,
    P: Pacer,
{
    let total = table.len();
    let mut tally = Tally::default();
    let mut stop = StopReason::Completed;
    let mut stopped_at = None;
    let mut called = false;

    for index in 0..total {
        let url = table.rows[index].url().to_string();
        if url.is_empty() {
            debug!(row = index + 1, "skipping row without URL");
            on_progress(Progress {
                index: index + 1,
                total,
                url: &url,
                status: None,
            });
            continue;
        }

        if usage.is_exhausted(options.quota) {
            warn!(quota = options.quota, count = usage.count, "daily API quota reached");
            stop = StopReason::QuotaExhausted;
            stopped_at = Some(index);
            break;
        }

        if called {
            options.pacer.pause().await;
        }

        // After the pause, so a stop raised while waiting skips this row.
        if options.stop.is_some_and(|s| s.load(Ordering::Relaxed)) {
            info!(row = index + 1, "batch interrupted");
            stop = StopReason::Interrupted;
            stopped_at = Some(index);
            break;
        }
        called = true;

        let check = checker.check_indexed(&url).await;
        let status = check.status;
        if status == IndexStatus::Error {
            warn!(url = %url, detail = %check.detail, "index check returned an error");
        }
        tally.record(status);
        table.rows[index].apply(check);

        usage.record_call();
        if let Err(e) = store.save(&usage) {
            warn!(error = %e, count = usage.count, "failed to persist usage, continuing");
        }

        on_progress(Progress {
            index: index + 1,
            total,
            url: &url,
            status: Some(status),
        });
    }

    let skipped = stopped_at.map_or(0, |start| {
        table.rows[start..]
            .iter()
            .filter(|r| !r.url().is_empty())
            .count()
    });

    info!(
        indexed = tally.indexed,
        not_indexed = tally.not_indexed,
        error = tally.error,
        skipped,
        count = usage.count,
        "batch finished"
    );

    BatchOutcome {
        result: BatchResult { table, tally },
        stop,
        skipped,
        usage,
    }
}
