//! Generic per-source crawler.
//!
//! Drives a [`SiteAdapter`] through listing pages, date filters, and
//! pagination. The server-side date filter is tried first because it is
//! faster and more precise; any failure on that path falls back to raw
//! pagination with local date comparison. A single bad row never aborts a
//! page or a run.

use chrono::{Duration, NaiveDate, Utc};
use tracing::{debug, info, warn};

use super::adapter::{ListingRow, SiteAdapter};
use super::{ArticleCandidate, PageSource, ScrapeError};
use crate::config::{ScrapingConfig, SourceConfig};
use crate::repository::ArticleRepository;

/// Crawls one configured source for one run.
///
/// Owns its page source exclusively; nothing here is shared across
/// concurrent scrapers except the repository, which has its own locking
/// discipline.
pub struct SourceScraper {
    source: SourceConfig,
    adapter: Box<dyn SiteAdapter>,
    pages: Box<dyn PageSource>,
    articles: ArticleRepository,
    config: ScrapingConfig,
}

enum RowOutcome {
    Candidate(ArticleCandidate),
    TooOld,
    OutOfRange,
    Skipped,
}

impl SourceScraper {
    pub fn new(
        source: SourceConfig,
        adapter: Box<dyn SiteAdapter>,
        pages: Box<dyn PageSource>,
        articles: ArticleRepository,
        config: ScrapingConfig,
    ) -> Self {
        Self {
            source,
            adapter,
            pages,
            articles,
            config,
        }
    }

    /// Scrape releases published in the last `days_back` days.
    pub async fn scrape_recent(
        &mut self,
        days_back: u32,
    ) -> Result<Vec<ArticleCandidate>, ScrapeError> {
        let end = Utc::now().date_naive();
        let start = end - Duration::days(days_back as i64);
        self.scrape_date_range(start, end).await
    }

    /// Scrape releases published within [start, end].
    pub async fn scrape_date_range(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ArticleCandidate>, ScrapeError> {
        info!(
            "scraping {} from {} to {}",
            self.source.name, start, end
        );

        match self.scrape_with_date_filter(start, end).await {
            Ok(candidates) => Ok(candidates),
            Err(e) => {
                warn!(
                    "date filtering failed for {} ({}), falling back to pagination",
                    self.source.name, e
                );
                self.scrape_with_pagination_fallback(start, end).await
            }
        }
    }

    /// Release the underlying page source. Idempotent.
    pub async fn close(&mut self) {
        self.pages.close().await;
    }

    /// Paginate the site's own date-filtered listing.
    async fn scrape_with_date_filter(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ArticleCandidate>, ScrapeError> {
        let listing = self.adapter.listing_url(&self.source);
        let filter_urls = self.adapter.filter_urls(&listing, start, end);
        if filter_urls.is_empty() {
            return Err(ScrapeError::DateFilter(self.source.id.clone()));
        }

        let mut candidates = Vec::new();

        for filter_url in filter_urls {
            for page in 0..self.config.max_pages_per_run {
                let url = self.adapter.page_url(&filter_url, page);
                debug!("loading filtered page {}: {}", page + 1, url);
                let html = self.pages.fetch_page(&url).await?;

                let rows = self.adapter.parse_listing(&html, &self.source.base_url);
                if rows.is_empty() {
                    debug!("no rows on page {}, end of results", page + 1);
                    break;
                }

                let before = candidates.len();
                for row in &rows {
                    if let RowOutcome::Candidate(c) = self.process_row(row, start, end).await {
                        candidates.push(c);
                    }
                }
                info!(
                    "page {}: {} rows, {} in range",
                    page + 1,
                    rows.len(),
                    candidates.len() - before
                );
            }
        }

        info!(
            "date filtering found {} articles for {}",
            candidates.len(),
            self.source.name
        );
        Ok(candidates)
    }

    /// Paginate the unfiltered listing, comparing dates locally.
    ///
    /// Stops early when most of a page's rows predate the range start; the
    /// threshold is configurable and empirical. A hard page cap bounds the
    /// worst case either way.
    async fn scrape_with_pagination_fallback(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ArticleCandidate>, ScrapeError> {
        let listing = self.adapter.listing_url(&self.source);
        let mut candidates = Vec::new();

        for page in 0..self.config.max_pages_per_run {
            let url = self.adapter.page_url(&listing, page);
            debug!("loading fallback page {}: {}", page + 1, url);
            let html = match self.pages.fetch_page(&url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!("fallback page {} failed: {}", page + 1, e);
                    break;
                }
            };

            let rows = self.adapter.parse_listing(&html, &self.source.base_url);
            if rows.is_empty() {
                debug!("no rows on page {}, end of results", page + 1);
                break;
            }

            let mut too_old = 0usize;
            let before = candidates.len();
            for row in &rows {
                match self.process_row(row, start, end).await {
                    RowOutcome::Candidate(c) => candidates.push(c),
                    RowOutcome::TooOld => too_old += 1,
                    RowOutcome::OutOfRange | RowOutcome::Skipped => {}
                }
            }
            info!(
                "page {}: {} rows, {} in range, {} too old",
                page + 1,
                rows.len(),
                candidates.len() - before,
                too_old
            );

            if too_old as f64 >= rows.len() as f64 * self.config.stale_page_threshold {
                info!("stopping: page is mostly older than {}", start);
                break;
            }
        }

        info!(
            "pagination fallback found {} articles for {}",
            candidates.len(),
            self.source.name
        );
        Ok(candidates)
    }

    /// Turn one listing row into a candidate, or classify why not.
    async fn process_row(&mut self, row: &ListingRow, start: NaiveDate, end: NaiveDate) -> RowOutcome {
        if let Some(date) = row.published_date {
            if date < start {
                return RowOutcome::TooOld;
            }
            if date > end {
                return RowOutcome::OutOfRange;
            }
        }

        // cheap existence check before the expensive detail fetch
        match self.articles.exists_by_title(&row.title).await {
            Ok(true) => {
                debug!("already stored: {}", row.title);
                return RowOutcome::Skipped;
            }
            Ok(false) => {}
            Err(e) => warn!("title pre-check failed for '{}': {}", row.title, e),
        }

        let html = match self.pages.fetch_page(&row.url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("skipping {}: {}", row.url, e);
                return RowOutcome::Skipped;
            }
        };

        let date = match row
            .published_date
            .or_else(|| self.adapter.extract_date(&html))
        {
            Some(date) => date,
            None => {
                warn!("could not determine date for {}", row.url);
                return RowOutcome::Skipped;
            }
        };
        if date < start {
            return RowOutcome::TooOld;
        }
        if date > end {
            return RowOutcome::OutOfRange;
        }

        let content = match self.adapter.extract_content(&html, &self.config) {
            Some(content) => content,
            None => {
                warn!("insufficient content extracted from {}", row.url);
                return RowOutcome::Skipped;
            }
        };

        let tags = row.release_number.iter().cloned().collect();
        RowOutcome::Candidate(ArticleCandidate {
            title: row.title.clone(),
            content,
            url: row.url.clone(),
            published_date: date,
            author: None,
            category: Some(self.adapter.category().to_string()),
            tags,
        })
    }
}
