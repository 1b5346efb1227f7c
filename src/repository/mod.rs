//! SQLite persistence layer.
//!
//! Repositories are thin: they translate between domain models and Diesel
//! records, and route every write through the lock-retry discipline in
//! [`retry`]. [`DbContext`] is the single entry point.

pub mod article;
pub mod context;
pub mod pool;
pub mod records;
pub mod retry;
pub mod scraping_log;
pub mod source;

pub use article::{ArticleRepository, BatchDedup, SaveOutcome};
pub use context::DbContext;
pub use pool::{AsyncSqlitePool, DieselError};
pub use retry::{execute_with_retry, RetryPolicy};
pub use scraping_log::ScrapingLogRepository;
pub use source::SourceRepository;

use chrono::{DateTime, Utc};

/// Parse an RFC 3339 timestamp column, falling back to the epoch on bad data.
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| DateTime::<Utc>::from(std::time::UNIX_EPOCH))
}

/// Parse an optional timestamp column; None and unparseable both map to None.
pub(crate) fn parse_datetime_opt(s: Option<&str>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}
