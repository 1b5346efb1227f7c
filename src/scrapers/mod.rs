//! Scraping pipeline: per-source crawlers over browser-rendered agency sites.
//!
//! One [`SourceScraper`] drives a [`SiteAdapter`] through listing pages, date
//! filters, and pagination, fetching rendered HTML from a [`PageSource`]
//! (a headless browser in production, plain HTTP when the browser feature is
//! off, a mock in tests).

pub mod adapter;
pub mod adapters;
pub mod browser;
pub mod fetcher;
pub mod source_scraper;

pub use adapter::{ListingRow, SiteAdapter};
pub use browser::BrowserSession;
pub use fetcher::{FetchError, RateLimitedFetcher};
pub use source_scraper::SourceScraper;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::repository::DieselError;

/// A scraped press release before fingerprinting and persistence.
#[derive(Debug, Clone)]
pub struct ArticleCandidate {
    pub title: String,
    pub content: String,
    pub url: String,
    pub published_date: NaiveDate,
    pub author: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
}

/// Errors that abort a whole source run.
///
/// Per-row failures are logged and skipped inside the scraper; only
/// source-scoped conditions surface through this type.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("browser session unavailable: {0}")]
    Browser(String),

    #[error("server-side date filter unavailable: {0}")]
    DateFilter(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("database error: {0}")]
    Database(#[from] DieselError),
}

/// Supplier of rendered page HTML.
///
/// Exactly one page source is owned per source run; it is never shared
/// across concurrent scrapers.
#[async_trait]
pub trait PageSource: Send {
    /// Navigate to `url` and return the page HTML.
    async fn fetch_page(&mut self, url: &str) -> Result<String, ScrapeError>;

    /// Release any underlying resources. Idempotent.
    async fn close(&mut self);
}
