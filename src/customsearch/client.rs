use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use super::types::{ApiError, IndexCheck, SearchResponse};
use crate::config::{ApiKey, Credentials};

const API_BASE: &str = "https://www.googleapis.com/customsearch/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

const QUOTA_REASONS: &[&str] = &["dailyLimitExceeded", "quotaExceeded"];
const RATE_LIMIT_REASONS: &[&str] = &["rateLimitExceeded", "userRateLimitExceeded"];

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("API rate limit exceeded. Please retry later.")]
    RateLimited,

    #[error("API quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid API endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Answers "is this URL indexed?" for the batch processor.
/// Implemented by `CustomSearchClient` for production; mock implementations used in tests.
///
/// Never fails: every provider failure comes back as an `IndexStatus::Error` check.
pub trait IndexChecker {
    async fn check_indexed(&self, url: &str) -> IndexCheck;
}

/// Client for the Google Custom Search JSON API.
#[derive(Clone)]
pub struct CustomSearchClient {
    http: Client,
    api_key: ApiKey,
    search_engine_id: String,
    base_url: String,
}

impl std::fmt::Debug for CustomSearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomSearchClient")
            .field("api_key", &self.api_key)
            .field("search_engine_id", &self.search_engine_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl CustomSearchClient {
    pub fn new(http: Client, credentials: Credentials) -> Self {
        Self {
            http,
            api_key: credentials.api_key,
            search_engine_id: credentials.search_engine_id,
            base_url: API_BASE.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            api_key: ApiKey::new("test-key"),
            search_engine_id: "test-cx".to_string(),
            base_url: base_url.to_string(),
        }
    }

    fn request_url(&self, query: &str) -> Result<Url, SearchError> {
        let url = Url::parse_with_params(
            &self.base_url,
            [
                ("key", self.api_key.expose()),
                ("cx", self.search_engine_id.as_str()),
                ("q", query),
                ("num", "1"),
            ],
        )?;
        Ok(url)
    }

    /// Run one query against the configured search engine.
    pub async fn search(&self, query: &str) -> Result<SearchResponse, SearchError> {
        let url = self.request_url(query)?;

        debug_assert!(
            url.scheme() == "https" || cfg!(test),
            "API key must only be sent over HTTPS"
        );

        let response = self
            .http
            .get(url)
            .header("User-Agent", crate::USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("Custom Search API rate limited");
            return Err(SearchError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if let Ok(body) = serde_json::from_str::<SearchResponse>(&text)
                && let Some(err) = &body.error
            {
                let classified = classify_api_error(err, status.as_u16());
                warn!(error = %classified, "Custom Search API error");
                return Err(classified);
            }
            let end = text.floor_char_boundary(200);
            warn!(status = %status, "Custom Search API error (no structured body)");
            return Err(SearchError::Api {
                code: status.as_u16(),
                message: format!("HTTP {status}: {}", &text[..end]),
            });
        }

        let text = response.text().await?;
        let body: SearchResponse = serde_json::from_str(&text)
            .map_err(|e| SearchError::Malformed(e.to_string()))?;

        if let Some(err) = &body.error {
            let classified = classify_api_error(err, status.as_u16());
            warn!(error = %classified, "Custom Search API error in 200 response");
            return Err(classified);
        }

        Ok(body)
    }
}

impl IndexChecker for CustomSearchClient {
    async fn check_indexed(&self, url: &str) -> IndexCheck {
        let query = exact_match_query(url);
        let outcome = self
            .search(&query)
            .await
            .and_then(|response| interpret_response(&response));

        match outcome {
            Ok(check) => {
                debug!(url, status = %check.status, "index check complete");
                check
            }
            Err(e) => {
                warn!(url, error = %e, "index check failed");
                IndexCheck::error(e.to_string())
            }
        }
    }
}

/// Quote the trimmed URL so the engine matches it literally.
pub fn exact_match_query(url: &str) -> String {
    format!("\"{}\"", url.trim())
}

/// First result's link verbatim, or not indexed when there are no results.
fn interpret_response(response: &SearchResponse) -> Result<IndexCheck, SearchError> {
    match response.items.as_deref() {
        Some([first, ..]) => match first.link.as_deref() {
            Some(link) if !link.is_empty() => Ok(IndexCheck::indexed(link)),
            _ => Err(SearchError::Malformed(
                "first result has no link".to_string(),
            )),
        },
        _ => Ok(IndexCheck::not_indexed()),
    }
}

fn classify_api_error(err: &ApiError, http_status: u16) -> SearchError {
    let message = err
        .message
        .clone()
        .unwrap_or_else(|| "Unknown error".to_string());
    let has_reason = |reasons: &[&str]| {
        err.errors
            .iter()
            .filter_map(|d| d.reason.as_deref())
            .any(|r| reasons.iter().any(|&known| known == r))
    };

    if has_reason(QUOTA_REASONS) {
        return SearchError::QuotaExhausted(message);
    }
    if has_reason(RATE_LIMIT_REASONS) {
        return SearchError::RateLimited;
    }

    match err.code.unwrap_or(http_status) {
        429 => SearchError::RateLimited,
        0 => SearchError::Api {
            code: 0,
            message: format!("Unknown error (no status code): {message}"),
        },
        code => SearchError::Api { code, message },
    }
}
