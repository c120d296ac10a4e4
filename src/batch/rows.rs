use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::customsearch::{IndexCheck, IndexStatus};

pub const STATUS_COLUMN: &str = "Indexed Status";
pub const INDEXED_URL_COLUMN: &str = "Indexed URL";

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("cannot open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("cannot write {}: {source}", path.display())]
    Write { path: PathBuf, source: csv::Error },

    #[error("input has no columns; the first column must hold the URLs")]
    NoColumns,
}

/// One input row. The first cell is the URL; the other cells pass through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRow {
    cells: Vec<String>,
    pub status: Option<IndexStatus>,
    pub indexed_url: String,
}

impl UrlRow {
    pub fn new(cells: Vec<String>) -> Self {
        Self {
            cells,
            status: None,
            indexed_url: String::new(),
        }
    }

    /// Trimmed URL cell; empty when the cell is blank or missing.
    pub fn url(&self) -> &str {
        self.cells.first().map(|c| c.trim()).unwrap_or_default()
    }

    pub fn apply(&mut self, check: IndexCheck) {
        self.status = Some(check.status);
        self.indexed_url = check.detail;
    }
}

/// Uploaded table plus the two result columns.
///
/// Input files that already carry `Indexed Status` / `Indexed URL` columns
/// have them reused in place; otherwise they are appended on output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTable {
    headers: Vec<String>,
    status_col: Option<usize>,
    indexed_url_col: Option<usize>,
    pub rows: Vec<UrlRow>,
}

impl UrlTable {
    pub fn new(headers: Vec<String>, rows: Vec<UrlRow>) -> Result<Self, TableError> {
        if headers.is_empty() {
            return Err(TableError::NoColumns);
        }
        let position = |name: &str| headers.iter().position(|h| h.trim() == name);
        let status_col = position(STATUS_COLUMN).filter(|&i| i > 0);
        let indexed_url_col = position(INDEXED_URL_COLUMN).filter(|&i| i > 0);
        Ok(Self {
            headers,
            status_col,
            indexed_url_col,
            rows,
        })
    }

    /// Build a single-column table from bare URLs.
    #[cfg(test)]
    pub fn from_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: vec!["URL".to_string()],
            status_col: None,
            indexed_url_col: None,
            rows: urls.into_iter().map(|u| UrlRow::new(vec![u.into()])).collect(),
        }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers: Vec<String> = csv.headers()?.iter().map(str::to_string).collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(TableError::NoColumns);
        }

        let mut rows = Vec::new();
        for record in csv.records() {
            let record = record?;
            rows.push(UrlRow::new(record.iter().map(str::to_string).collect()));
        }

        Self::new(headers, rows)
    }

    pub fn from_path(path: &Path) -> Result<Self, TableError> {
        let file = File::open(path).map_err(|source| TableError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    /// Header of the column treated as the URL column (always the first).
    pub fn url_header(&self) -> &str {
        &self.headers[0]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows with a non-empty URL.
    pub fn url_count(&self) -> usize {
        self.rows.iter().filter(|r| !r.url().is_empty()).count()
    }

    pub fn output_headers(&self) -> Vec<String> {
        let mut headers = self.headers.clone();
        if self.status_col.is_none() {
            headers.push(STATUS_COLUMN.to_string());
        }
        if self.indexed_url_col.is_none() {
            headers.push(INDEXED_URL_COLUMN.to_string());
        }
        headers
    }

    /// Row cells laid out under [`UrlTable::output_headers`].
    ///
    /// Unprocessed rows keep whatever a reused result column already held.
    pub fn output_record(&self, row: &UrlRow) -> Vec<String> {
        let mut record = row.cells.clone();
        record.resize(self.headers.len(), String::new());

        let status = row.status.map(IndexStatus::as_str);
        let indexed_url = row.status.map(|_| row.indexed_url.as_str());

        for (col, value) in [(self.status_col, status), (self.indexed_url_col, indexed_url)] {
            match col {
                Some(i) => {
                    if let Some(v) = value {
                        record[i] = v.to_string();
                    }
                }
                None => record.push(value.unwrap_or_default().to_string()),
            }
        }
        record
    }
}
