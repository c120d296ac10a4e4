//! Exact-match index lookups against the Google Custom Search JSON API.

pub mod client;
pub mod types;

pub use client::{CustomSearchClient, IndexChecker};
pub use types::{IndexCheck, IndexStatus};
