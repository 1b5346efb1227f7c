//! Database context: owns the connection factory and hands out repositories.

use std::path::Path;

use diesel_async::RunQueryDsl;

use super::article::ArticleRepository;
use super::pool::{AsyncSqlitePool, DieselError};
use super::retry::RetryPolicy;
use super::scraping_log::ScrapingLogRepository;
use super::source::SourceRepository;

const SCHEMA_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS sources (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    base_url TEXT NOT NULL,
    scraper_type TEXT NOT NULL,
    enabled INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS articles (
    id TEXT PRIMARY KEY NOT NULL,
    source_id TEXT NOT NULL REFERENCES sources(id),
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    url TEXT NOT NULL UNIQUE,
    content_hash TEXT NOT NULL UNIQUE,
    published_date TEXT NOT NULL,
    scraped_at TEXT NOT NULL,
    author TEXT,
    category TEXT,
    tags TEXT NOT NULL DEFAULT '',
    word_count INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_articles_source_date
    ON articles(source_id, published_date);

CREATE TABLE IF NOT EXISTS scraping_logs (
    id TEXT PRIMARY KEY NOT NULL,
    source_id TEXT NOT NULL,
    started_at TEXT NOT NULL,
    completed_at TEXT,
    status TEXT NOT NULL,
    articles_found INTEGER NOT NULL DEFAULT 0,
    articles_new INTEGER NOT NULL DEFAULT 0,
    error_message TEXT
);
"#;

/// Owns database access for the whole application.
///
/// Cloning is cheap; all repositories share the same connection factory and
/// retry policy.
#[derive(Clone)]
pub struct DbContext {
    pool: AsyncSqlitePool,
    retry: RetryPolicy,
}

impl DbContext {
    pub fn new(db_path: &Path) -> Self {
        Self {
            pool: AsyncSqlitePool::from_path(db_path),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(db_path: &Path, retry: RetryPolicy) -> Self {
        Self {
            pool: AsyncSqlitePool::from_path(db_path),
            retry,
        }
    }

    /// Create tables and indexes if they do not exist. Idempotent.
    pub async fn init_schema(&self) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;
        diesel::sql_query("PRAGMA foreign_keys = ON")
            .execute(&mut conn)
            .await?;
        for statement in SCHEMA_DDL.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            diesel::sql_query(statement).execute(&mut conn).await?;
        }
        Ok(())
    }

    pub fn sources(&self) -> SourceRepository {
        SourceRepository::new(self.pool.clone(), self.retry.clone())
    }

    pub fn articles(&self) -> ArticleRepository {
        ArticleRepository::new(self.pool.clone(), self.retry.clone())
    }

    pub fn scraping_logs(&self) -> ScrapingLogRepository {
        ScrapingLogRepository::new(self.pool.clone(), self.retry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn init_schema_is_idempotent() {
        let dir = tempdir().unwrap();
        let ctx = DbContext::new(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        ctx.init_schema().await.unwrap();

        assert_eq!(ctx.sources().get_all().await.unwrap().len(), 0);
    }
}
