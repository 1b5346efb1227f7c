//! Data models for presswatch.

mod article;
mod scraping_log;
mod source;

pub use article::Article;
pub use scraping_log::{ScrapeStatus, ScrapingLog};
pub use source::{ScraperType, Source};
