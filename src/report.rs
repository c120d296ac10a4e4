//! Plain-text rendering of batch results and the CSV export.

use std::io;
use std::path::Path;

use crate::batch::rows::{INDEXED_URL_COLUMN, STATUS_COLUMN};
use crate::batch::{BatchOutcome, StopReason, TableError, Tally, UrlTable};
use crate::customsearch::IndexStatus;
use crate::usage::{LoadSource, UsageRecord};

pub const DEFAULT_REPORT_FILE: &str = "google_index_results.csv";

const BAR_WIDTH: usize = 30;

/// Non-zero status counts, in display order. This is the chart data.
pub fn breakdown(tally: &Tally) -> Vec<(IndexStatus, usize)> {
    IndexStatus::ALL
        .into_iter()
        .map(|s| (s, tally.get(s)))
        .filter(|&(_, n)| n > 0)
        .collect()
}

pub fn format_breakdown(tally: &Tally) -> String {
    let slices = breakdown(tally);
    if slices.is_empty() {
        return "No data available for chart\n".to_string();
    }

    let total = tally.total();
    let mut out = format!("Indexation Status ({total} URLs)\n");
    for (status, count) in slices {
        let share = count as f64 / total as f64;
        let filled = ((share * BAR_WIDTH as f64).round() as usize).max(1);
        out.push_str(&format!(
            "{:<12} {:<width$} {count} ({:.1}%)\n",
            status.label(),
            "█".repeat(filled),
            share * 100.0,
            width = BAR_WIDTH,
        ));
    }
    out
}

pub fn format_results(table: &UrlTable) -> String {
    let mut out = format!(
        "{} | {STATUS_COLUMN} | {INDEXED_URL_COLUMN}\n",
        table.url_header()
    );
    for row in &table.rows {
        let status = row.status.map_or("-", IndexStatus::as_str);
        let url = if row.url().is_empty() { "(empty)" } else { row.url() };
        out.push_str(&format!("{url} | {status} | {}\n", row.indexed_url));
    }
    out
}

pub fn format_summary(outcome: &BatchOutcome, quota: u32) -> String {
    let used = outcome.result.tally.total();
    let remaining = outcome.usage.remaining(quota);
    let mut out = format!("API calls used in this run: {used}\n");
    out.push_str(&format!("Remaining API calls today: {remaining}/{quota}\n"));

    match outcome.stop {
        StopReason::Completed => out.push_str("All URLs have been processed.\n"),
        StopReason::QuotaExhausted => out.push_str(&format!(
            "Daily API quota of {quota} requests has been reached; {} URL(s) left unchecked.\n",
            outcome.skipped
        )),
        StopReason::Interrupted => out.push_str(&format!(
            "Stopped on request; {} URL(s) left unchecked.\n",
            outcome.skipped
        )),
    }
    out
}

pub fn format_usage(record: &UsageRecord, source: LoadSource, quota: u32, path: &Path) -> String {
    let file_status = match source {
        LoadSource::Stored | LoadSource::NewDay => "found",
        LoadSource::Missing => "not found (a new file will be created)",
        LoadSource::Unreadable => "unreadable (counter starts from zero)",
    };

    let mut out = format!("Usage file: {} ({file_status})\n", path.display());
    out.push_str(&format!("Date: {}\n", record.date));
    out.push_str(&format!(
        "Remaining API calls: {}/{quota}\n",
        record.remaining(quota)
    ));
    out.push_str(&format!("Calls made today: {}\n", record.count));
    out.push_str("Resets at local midnight\n");
    out
}

/// Write the augmented table: original columns plus status and matched URL.
pub fn write_csv<W: io::Write>(table: &UrlTable, writer: W) -> Result<(), csv::Error> {
    let mut csv = csv::WriterBuilder::new().flexible(true).from_writer(writer);
    csv.write_record(table.output_headers())?;
    for row in &table.rows {
        csv.write_record(table.output_record(row))?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_csv_file(table: &UrlTable, path: &Path) -> Result<(), TableError> {
    let to_err = |source: csv::Error| TableError::Write {
        path: path.to_path_buf(),
        source,
    };
    let file = std::fs::File::create(path).map_err(|e| to_err(e.into()))?;
    write_csv(table, file).map_err(to_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customsearch::IndexCheck;
    use chrono::NaiveDate;

    fn checked_table() -> UrlTable {
        let mut table = UrlTable::from_reader(
            "page,notes\nhttps://a.com,first\n,blank\nhttps://b.com,\"with, comma\"\nhttps://c.com,last\n"
                .as_bytes(),
        )
        .unwrap();
        table.rows[0].apply(IndexCheck::indexed("https://a.com/"));
        table.rows[2].apply(IndexCheck::error("Network error: timed out"));
        table
    }

    fn outcome(stop: StopReason, skipped: usize) -> BatchOutcome {
        let tally = Tally {
            indexed: 3,
            not_indexed: 1,
            error: 0,
        };
        BatchOutcome {
            result: crate::batch::processor::BatchResult {
                table: UrlTable::from_urls(["https://a.com"]),
                tally,
            },
            stop,
            skipped,
            usage: UsageRecord {
                date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                count: 40,
            },
        }
    }

    #[test]
    fn breakdown_drops_zero_counts() {
        let tally = Tally {
            indexed: 2,
            not_indexed: 0,
            error: 1,
        };
        assert_eq!(
            breakdown(&tally),
            vec![(IndexStatus::Indexed, 2), (IndexStatus::Error, 1)]
        );
    }

    #[test]
    fn format_breakdown_shows_title_and_shares() {
        let text = format_breakdown(&Tally {
            indexed: 3,
            not_indexed: 1,
            error: 0,
        });
        assert!(text.starts_with("Indexation Status (4 URLs)"));
        assert!(text.contains("Indexed"));
        assert!(text.contains("75.0%"));
        assert!(text.contains("Not Indexed"));
        assert!(!text.contains("Error"));
    }

    #[test]
    fn format_breakdown_empty() {
        assert_eq!(
            format_breakdown(&Tally::default()),
            "No data available for chart\n"
        );
    }

    #[test]
    fn format_results_lists_every_row() {
        let text = format_results(&checked_table());
        assert!(text.starts_with("page | Indexed Status | Indexed URL"));
        assert!(text.contains("https://a.com | indexed | https://a.com/"));
        assert!(text.contains("(empty) | - |"));
        assert!(text.contains("https://b.com | error | Network error: timed out"));
        assert!(text.contains("https://c.com | - |"));
    }

    #[test]
    fn summary_reports_quota_stop() {
        let text = format_summary(&outcome(StopReason::QuotaExhausted, 7), 100);
        assert!(text.contains("API calls used in this run: 4"));
        assert!(text.contains("Remaining API calls today: 60/100"));
        assert!(text.contains("7 URL(s) left unchecked"));
    }

    #[test]
    fn summary_reports_completion() {
        let text = format_summary(&outcome(StopReason::Completed, 0), 100);
        assert!(text.contains("All URLs have been processed."));
    }

    #[test]
    fn usage_status_mentions_missing_file() {
        let record = UsageRecord::fresh(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        let text = format_usage(&record, LoadSource::Missing, 100, Path::new("api_usage.json"));
        assert!(text.contains("api_usage.json (not found"));
        assert!(text.contains("Date: 2024-05-01"));
        assert!(text.contains("Remaining API calls: 100/100"));
    }

    #[test]
    fn csv_export_appends_result_columns() {
        let mut out = Vec::new();
        write_csv(&checked_table(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "page,notes,Indexed Status,Indexed URL");
        assert_eq!(lines[1], "https://a.com,first,indexed,https://a.com/");
        assert_eq!(lines[2], ",blank,,");
        assert_eq!(
            lines[3],
            "https://b.com,\"with, comma\",error,Network error: timed out"
        );
        assert_eq!(lines[4], "https://c.com,last,,");
    }

    #[test]
    fn csv_export_round_trips_through_reader() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_REPORT_FILE);
        write_csv_file(&checked_table(), &path).unwrap();

        let reread = UrlTable::from_path(&path).unwrap();
        assert_eq!(reread.len(), 4);
        assert_eq!(
            reread.output_headers(),
            vec!["page", "notes", "Indexed Status", "Indexed URL"]
        );
        assert_eq!(
            reread.output_record(&reread.rows[0]),
            vec!["https://a.com", "first", "indexed", "https://a.com/"]
        );
    }
}
