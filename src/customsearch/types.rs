use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub items: Option<Vec<SearchItem>>,
    pub error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
pub struct SearchItem {
    pub link: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub code: Option<u16>,
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub reason: Option<String>,
}

/// Outcome of one indexing check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    Indexed,
    NotIndexed,
    Error,
}

impl IndexStatus {
    pub const ALL: [IndexStatus; 3] = [Self::Indexed, Self::NotIndexed, Self::Error];

    /// Value written to the `Indexed Status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            IndexStatus::Indexed => "indexed",
            IndexStatus::NotIndexed => "not indexed",
            IndexStatus::Error => "error",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            IndexStatus::Indexed => "Indexed",
            IndexStatus::NotIndexed => "Not Indexed",
            IndexStatus::Error => "Error",
        }
    }
}

impl std::fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status plus its detail: the matched link when indexed, a diagnostic when
/// the check failed, empty otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexCheck {
    pub status: IndexStatus,
    pub detail: String,
}

impl IndexCheck {
    pub fn indexed(link: impl Into<String>) -> Self {
        Self {
            status: IndexStatus::Indexed,
            detail: link.into(),
        }
    }

    pub fn not_indexed() -> Self {
        Self {
            status: IndexStatus::NotIndexed,
            detail: String::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: IndexStatus::Error,
            detail: message.into(),
        }
    }
}
