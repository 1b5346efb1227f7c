//! Orchestrates one scraping run across all configured sources.
//!
//! Sources run sequentially to bound outstanding browser processes and to
//! keep writers off each other's locks. A failure in one source is converted
//! into a failed summary entry for that source only; the rest still run.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use tracing::{error, info, warn};

use crate::config::{BrowserSettings, ScrapingConfig, SourceConfig};
use crate::models::Article;
use crate::repository::{BatchDedup, DbContext, SaveOutcome};
use crate::scrapers::adapters::adapter_for;
use crate::scrapers::{
    BrowserSession, PageSource, RateLimitedFetcher, ScrapeError, SourceScraper,
};

/// Synchronous progress sink. Callers must not block in it.
pub type ProgressCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Per-source result of one run.
#[derive(Debug, Clone)]
pub struct SourceSummary {
    pub source_id: String,
    pub new_articles: usize,
    pub duplicate_articles: usize,
    pub total_articles: usize,
    /// Set when the whole source run failed or was skipped.
    pub error: Option<String>,
}

impl SourceSummary {
    fn failed(source_id: &str, error: String) -> Self {
        Self {
            source_id: source_id.to_string(),
            new_articles: 0,
            duplicate_articles: 0,
            total_articles: 0,
            error: Some(error),
        }
    }
}

/// Aggregated result across all sources in one run.
#[derive(Debug, Clone, Default)]
pub struct ScrapeSummary {
    pub sources: Vec<SourceSummary>,
}

impl ScrapeSummary {
    pub fn total_new(&self) -> usize {
        self.sources.iter().map(|s| s.new_articles).sum()
    }

    pub fn total_duplicates(&self) -> usize {
        self.sources.iter().map(|s| s.duplicate_articles).sum()
    }

    pub fn total_articles(&self) -> usize {
        self.sources.iter().map(|s| s.total_articles).sum()
    }
}

/// Builds the page source for one source run.
///
/// Injected so tests can substitute mock pages without process-wide state.
#[async_trait]
pub trait PageSourceFactory: Send + Sync {
    async fn create(&self, source: &SourceConfig) -> Result<Box<dyn PageSource>, ScrapeError>;
}

/// How pages are fetched in production.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchBackend {
    /// Headless browser; required for the JavaScript-heavy agency sites.
    Browser,
    /// Plain HTTP. Useful for diagnostics and browserless environments.
    Http,
}

pub struct DefaultPageSourceFactory {
    backend: FetchBackend,
    browser: BrowserSettings,
    scraping: ScrapingConfig,
}

impl DefaultPageSourceFactory {
    pub fn new(backend: FetchBackend, browser: BrowserSettings, scraping: ScrapingConfig) -> Self {
        Self {
            backend,
            browser,
            scraping,
        }
    }
}

#[async_trait]
impl PageSourceFactory for DefaultPageSourceFactory {
    async fn create(&self, source: &SourceConfig) -> Result<Box<dyn PageSource>, ScrapeError> {
        match self.backend {
            FetchBackend::Http => Ok(Box::new(RateLimitedFetcher::new(&self.scraping))),
            FetchBackend::Browser => {
                info!("launching browser session for {}", source.id);
                let session = BrowserSession::launch(&self.browser).await?;
                Ok(Box::new(session))
            }
        }
    }
}

/// Runs one SourceScraper per enabled source and aggregates the results.
pub struct ScraperManager {
    sources: Vec<SourceConfig>,
    db: DbContext,
    scraping: ScrapingConfig,
    factory: Box<dyn PageSourceFactory>,
    progress: ProgressCallback,
}

impl ScraperManager {
    pub fn new(
        sources: Vec<SourceConfig>,
        db: DbContext,
        scraping: ScrapingConfig,
        factory: Box<dyn PageSourceFactory>,
    ) -> Self {
        Self {
            sources,
            db,
            scraping,
            factory,
            // default sink: structured log
            progress: Arc::new(|msg: &str| info!("{}", msg)),
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    /// Scrape the last `days_back` days across all enabled sources.
    pub async fn scrape_all_recent(&self, days_back: u32) -> ScrapeSummary {
        let end = Utc::now().date_naive();
        let start = end - Duration::days(days_back as i64);
        self.scrape_all_range(start, end).await
    }

    /// Scrape a date range across all enabled sources.
    pub async fn scrape_all_range(&self, start: NaiveDate, end: NaiveDate) -> ScrapeSummary {
        let ids: Vec<String> = self.sources.iter().map(|s| s.id.clone()).collect();
        self.scrape_sources_range(&ids, start, end).await
    }

    /// Scrape a date range for an explicit subset of sources.
    pub async fn scrape_sources_range(
        &self,
        source_ids: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> ScrapeSummary {
        let mut summary = ScrapeSummary::default();

        for source in &self.sources {
            if !source_ids.contains(&source.id) {
                continue;
            }
            if !source.enabled {
                info!("skipping disabled source {}", source.id);
                continue;
            }
            summary
                .sources
                .push(self.scrape_source(source, start, end).await);
        }

        (self.progress)(&format!(
            "Run finished: {} new, {} duplicates, {} total across {} sources",
            summary.total_new(),
            summary.total_duplicates(),
            summary.total_articles(),
            summary.sources.len(),
        ));
        summary
    }

    async fn scrape_source(
        &self,
        source: &SourceConfig,
        start: NaiveDate,
        end: NaiveDate,
    ) -> SourceSummary {
        (self.progress)(&format!(
            "Scraping {} from {} to {}",
            source.name, start, end
        ));

        // configured but never seeded into the store: skip, don't fail the run
        match self.db.sources().exists(&source.id).await {
            Ok(true) => {}
            Ok(false) => {
                warn!("source {} not found in database, skipping", source.id);
                return SourceSummary::failed(&source.id, "source not found in database".into());
            }
            Err(e) => {
                error!("source lookup for {} failed: {}", source.id, e);
                return SourceSummary::failed(&source.id, e.to_string());
            }
        }

        let logs = self.db.scraping_logs();
        let log_id = match logs.start(&source.id).await {
            Ok(id) => id,
            Err(e) => {
                error!("could not open scraping log for {}: {}", source.id, e);
                return SourceSummary::failed(&source.id, e.to_string());
            }
        };

        let pages = match self.factory.create(source).await {
            Ok(pages) => pages,
            Err(e) => {
                let msg = format!("cannot scrape {}: {}", source.name, e);
                (self.progress)(&format!("Error: {msg}"));
                if let Err(log_err) = logs.fail(&log_id, &msg).await {
                    warn!("failed to record run failure: {}", log_err);
                }
                return SourceSummary::failed(&source.id, msg);
            }
        };

        let mut scraper = SourceScraper::new(
            source.clone(),
            adapter_for(source.scraper_type),
            pages,
            self.db.articles(),
            self.scraping.clone(),
        );
        let result = scraper.scrape_date_range(start, end).await;
        // release the browser on every exit path before touching the result
        scraper.close().await;

        let candidates = match result {
            Ok(candidates) => candidates,
            Err(e) => {
                let msg = format!("scraping {} failed: {}", source.name, e);
                (self.progress)(&format!("Error: {msg}"));
                if let Err(log_err) = logs.fail(&log_id, &msg).await {
                    warn!("failed to record run failure: {}", log_err);
                }
                return SourceSummary::failed(&source.id, msg);
            }
        };

        let articles = self.db.articles();
        let mut batch = BatchDedup::new();
        let found = candidates.len();
        let mut new_articles = 0usize;
        let mut duplicates = 0usize;

        for candidate in candidates {
            let article = Article::from_candidate(&source.id, candidate);
            match articles.save_if_new(&mut batch, &article).await {
                Ok(SaveOutcome::Saved) => {
                    new_articles += 1;
                    (self.progress)(&format!("Saved: {}", article.title));
                }
                Ok(
                    SaveOutcome::DuplicateBatch
                    | SaveOutcome::DuplicateDb
                    | SaveOutcome::DuplicateRace,
                ) => {
                    duplicates += 1;
                    (self.progress)(&format!("Duplicate: {}", article.title));
                }
                Err(e) => {
                    // abandoned write: logged, never silently dropped
                    error!("abandoned save of '{}': {}", article.title, e);
                    (self.progress)(&format!("Error saving {}: {}", article.title, e));
                }
            }
        }

        if let Err(e) = logs
            .complete(&log_id, found as i32, new_articles as i32)
            .await
        {
            warn!("failed to close scraping log for {}: {}", source.id, e);
        }

        (self.progress)(&format!(
            "{}: {} found, {} new, {} duplicates",
            source.name, found, new_articles, duplicates
        ));

        SourceSummary {
            source_id: source.id.clone(),
            new_articles,
            duplicate_articles: duplicates,
            total_articles: found,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ScrapeStatus, ScraperType, Source};
    use std::collections::HashMap;

    use tempfile::tempdir;

    const DOJ_LISTING: &str = r#"
        <div class="views-row">
            <h3 class="node__title"><a href="/pr/acme">Acme Corp Settles Claims</a></h3>
            <time datetime="2024-01-05T10:00:00Z">January 5, 2024</time>
        </div>
    "#;

    const DOJ_DETAIL: &str = r#"
        <html><body>
            <div class="field--name-body">
                <p>Acme Corp has agreed to settle claims brought by the department.
                The settlement includes a substantial civil penalty and a multi-year
                compliance monitoring agreement covering all business units.</p>
            </div>
        </body></html>
    "#;

    /// Factory serving canned pages per source; unknown sources fail to
    /// initialize, standing in for a browser that will not launch.
    struct CannedFactory {
        pages_by_source: HashMap<String, HashMap<String, String>>,
    }

    #[async_trait]
    impl PageSourceFactory for CannedFactory {
        async fn create(
            &self,
            source: &SourceConfig,
        ) -> Result<Box<dyn PageSource>, ScrapeError> {
            let pages = self
                .pages_by_source
                .get(&source.id)
                .cloned()
                .ok_or_else(|| ScrapeError::Browser("no usable browser".to_string()))?;
            Ok(Box::new(CannedPages { pages }))
        }
    }

    struct CannedPages {
        pages: HashMap<String, String>,
    }

    #[async_trait]
    impl PageSource for CannedPages {
        async fn fetch_page(&mut self, url: &str) -> Result<String, ScrapeError> {
            // unlisted pages render empty, ending pagination
            Ok(self.pages.get(url).cloned().unwrap_or_default())
        }

        async fn close(&mut self) {}
    }

    fn doj_source(id: &str) -> SourceConfig {
        SourceConfig {
            id: id.to_string(),
            name: format!("Agency {id}"),
            base_url: "https://agency.test".to_string(),
            scraper_type: ScraperType::Doj,
            press_releases_url: Some("https://agency.test/press".to_string()),
            enabled: true,
        }
    }

    fn doj_pages() -> HashMap<String, String> {
        let mut pages = HashMap::new();
        // server-side filter path, page 0
        pages.insert(
            "https://agency.test/press?start_date=01/01/2024&end_date=01/07/2024".to_string(),
            DOJ_LISTING.to_string(),
        );
        pages.insert(
            "https://agency.test/pr/acme".to_string(),
            DOJ_DETAIL.to_string(),
        );
        pages
    }

    async fn seeded_db(dir: &tempfile::TempDir, ids: &[&str]) -> DbContext {
        let ctx = DbContext::new(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        for id in ids {
            let source = Source::new(
                id.to_string(),
                format!("Agency {id}"),
                "https://agency.test".to_string(),
                ScraperType::Doj,
            );
            ctx.sources().save(&source).await.unwrap();
        }
        ctx
    }

    fn range() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
        )
    }

    #[tokio::test]
    async fn failed_source_does_not_poison_the_others() {
        let dir = tempdir().unwrap();
        let ctx = seeded_db(&dir, &["good", "bad"]).await;

        let factory = CannedFactory {
            pages_by_source: HashMap::from([("good".to_string(), doj_pages())]),
        };
        let manager = ScraperManager::new(
            vec![doj_source("good"), doj_source("bad")],
            ctx.clone(),
            ScrapingConfig::default(),
            Box::new(factory),
        );

        let (start, end) = range();
        let summary = manager.scrape_all_range(start, end).await;

        assert_eq!(summary.sources.len(), 2);
        let good = &summary.sources[0];
        assert_eq!(good.new_articles, 1);
        assert!(good.error.is_none());
        let bad = &summary.sources[1];
        assert_eq!(bad.new_articles, 0);
        assert!(bad.error.as_deref().unwrap().contains("no usable browser"));

        // both runs got a terminal log status
        let logs = ctx.scraping_logs().recent(10).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert!(logs
            .iter()
            .all(|l| l.status != ScrapeStatus::Running && l.completed_at.is_some()));
    }

    #[tokio::test]
    async fn second_run_yields_no_new_articles() {
        let dir = tempdir().unwrap();
        let ctx = seeded_db(&dir, &["doj"]).await;

        let make_manager = |ctx: DbContext| {
            ScraperManager::new(
                vec![doj_source("doj")],
                ctx,
                ScrapingConfig::default(),
                Box::new(CannedFactory {
                    pages_by_source: HashMap::from([("doj".to_string(), doj_pages())]),
                }),
            )
        };

        let (start, end) = range();
        let first = make_manager(ctx.clone()).scrape_all_range(start, end).await;
        assert_eq!(first.total_new(), 1);

        let second = make_manager(ctx.clone()).scrape_all_range(start, end).await;
        assert_eq!(second.total_new(), 0);

        assert_eq!(ctx.articles().count_for_source("doj").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unseeded_source_is_skipped_with_error() {
        let dir = tempdir().unwrap();
        let ctx = seeded_db(&dir, &[]).await;

        let manager = ScraperManager::new(
            vec![doj_source("ghost")],
            ctx,
            ScrapingConfig::default(),
            Box::new(CannedFactory {
                pages_by_source: HashMap::new(),
            }),
        );

        let (start, end) = range();
        let summary = manager.scrape_all_range(start, end).await;
        assert_eq!(summary.sources.len(), 1);
        assert!(summary.sources[0]
            .error
            .as_deref()
            .unwrap()
            .contains("not found"));
    }

    #[tokio::test]
    async fn progress_callback_sees_save_and_summary_messages() {
        let dir = tempdir().unwrap();
        let ctx = seeded_db(&dir, &["doj"]).await;

        let messages: Arc<std::sync::Mutex<Vec<String>>> =
            Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = messages.clone();

        let manager = ScraperManager::new(
            vec![doj_source("doj")],
            ctx,
            ScrapingConfig::default(),
            Box::new(CannedFactory {
                pages_by_source: HashMap::from([("doj".to_string(), doj_pages())]),
            }),
        )
        .with_progress(Arc::new(move |msg: &str| {
            sink.lock().unwrap().push(msg.to_string())
        }));

        let (start, end) = range();
        manager.scrape_all_range(start, end).await;

        let messages = messages.lock().unwrap();
        assert!(messages.iter().any(|m| m.starts_with("Scraping ")));
        assert!(messages
            .iter()
            .any(|m| m.contains("Saved: Acme Corp Settles Claims")));
        assert!(messages.iter().any(|m| m.starts_with("Run finished:")));
    }
}
