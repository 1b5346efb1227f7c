//! Article repository: dedup-aware persistence for ingested press releases.

use std::collections::HashSet;

use chrono::NaiveDate;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::pool::{AsyncSqlitePool, DieselError};
use super::records::{ArticleRecord, NewArticle};
use super::retry::{execute_with_retry, RetryPolicy};
use super::parse_datetime;
use crate::fingerprint::normalize_title;
use crate::models::Article;
use crate::schema::articles;

diesel::define_sql_function! {
    fn lower(x: diesel::sql_types::Text) -> diesel::sql_types::Text;
}

/// Classified result of a save attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Inserted and committed.
    Saved,
    /// Same hash or URL already processed earlier in this run.
    DuplicateBatch,
    /// An existing row matched by URL or content hash.
    DuplicateDb,
    /// Uniqueness violation at commit; another writer got there first.
    DuplicateRace,
}

/// Per-run set of hashes and URLs already processed, checked before any
/// database round-trip. Exclusively owned by one scraping run.
#[derive(Debug, Default)]
pub struct BatchDedup {
    hashes: HashSet<String>,
    urls: HashSet<String>,
}

impl BatchDedup {
    pub fn new() -> Self {
        Self::default()
    }

    fn contains(&self, hash: &str, url: &str) -> bool {
        self.hashes.contains(hash) || self.urls.contains(url)
    }

    fn insert(&mut self, hash: &str, url: &str) {
        self.hashes.insert(hash.to_string());
        self.urls.insert(url.to_string());
    }

    /// Roll back a reservation so later logic doesn't assume the row exists.
    fn remove(&mut self, hash: &str, url: &str) {
        self.hashes.remove(hash);
        self.urls.remove(url);
    }
}

impl From<ArticleRecord> for Article {
    fn from(record: ArticleRecord) -> Self {
        let tags = if record.tags.is_empty() {
            Vec::new()
        } else {
            record.tags.split(',').map(|t| t.to_string()).collect()
        };
        Article {
            id: record.id,
            source_id: record.source_id,
            title: record.title,
            content: record.content,
            url: record.url,
            content_hash: record.content_hash,
            published_date: NaiveDate::parse_from_str(&record.published_date, "%Y-%m-%d")
                .unwrap_or_default(),
            scraped_at: parse_datetime(&record.scraped_at),
            author: record.author,
            category: record.category,
            tags,
            word_count: record.word_count,
        }
    }
}

/// Repository for ingested articles.
#[derive(Clone)]
pub struct ArticleRepository {
    pool: AsyncSqlitePool,
    retry: RetryPolicy,
}

impl ArticleRepository {
    pub fn new(pool: AsyncSqlitePool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }

    /// Save an article unless it is a duplicate.
    ///
    /// Checks the in-run batch set, then the store by URL-or-hash, then
    /// inserts with the lock-retry discipline. A uniqueness violation at
    /// commit is classified as a race duplicate and the batch reservation is
    /// rolled back. A hard error also rolls back the reservation and is
    /// returned to the caller, which must log the abandoned write.
    pub async fn save_if_new(
        &self,
        batch: &mut BatchDedup,
        article: &Article,
    ) -> Result<SaveOutcome, DieselError> {
        if batch.contains(&article.content_hash, &article.url) {
            return Ok(SaveOutcome::DuplicateBatch);
        }

        if self
            .find_by_url_or_hash(&article.url, &article.content_hash)
            .await?
            .is_some()
        {
            return Ok(SaveOutcome::DuplicateDb);
        }

        batch.insert(&article.content_hash, &article.url);

        let published_date = article.published_date.format("%Y-%m-%d").to_string();
        let scraped_at = article.scraped_at.to_rfc3339();
        let tags = article.tags.join(",");

        let insert = execute_with_retry(&self.retry, || {
            let published_date = published_date.clone();
            let scraped_at = scraped_at.clone();
            let tags = tags.clone();
            async move {
                let mut conn = self.pool.get().await?;
                let new_article = NewArticle {
                    id: &article.id,
                    source_id: &article.source_id,
                    title: article.title.trim(),
                    content: &article.content,
                    url: &article.url,
                    content_hash: &article.content_hash,
                    published_date: &published_date,
                    scraped_at: &scraped_at,
                    author: article.author.as_deref(),
                    category: article.category.as_deref(),
                    tags: &tags,
                    word_count: article.word_count,
                };
                diesel::insert_into(articles::table)
                    .values(&new_article)
                    .execute(&mut conn)
                    .await?;
                Ok(())
            }
        })
        .await;

        match insert {
            Ok(()) => Ok(SaveOutcome::Saved),
            Err(DieselError::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            )) => {
                batch.remove(&article.content_hash, &article.url);
                Ok(SaveOutcome::DuplicateRace)
            }
            Err(e) => {
                batch.remove(&article.content_hash, &article.url);
                Err(e)
            }
        }
    }

    /// Cheap existence check by normalized title, used to skip detail fetches.
    ///
    /// SQLite's `lower()` folds ASCII only, so a stored title with non-ASCII
    /// uppercase misses here; the miss only costs a detail fetch, since the
    /// url/hash check in [`Self::save_if_new`] still catches the duplicate.
    pub async fn exists_by_title(&self, title: &str) -> Result<bool, DieselError> {
        let normalized = normalize_title(title);
        let mut conn = self.pool.get().await?;

        use diesel::dsl::count_star;
        let count: i64 = articles::table
            .filter(lower(articles::title).eq(&normalized))
            .select(count_star())
            .first(&mut conn)
            .await?;

        Ok(count > 0)
    }

    /// Get an article by id.
    pub async fn get(&self, id: &str) -> Result<Option<Article>, DieselError> {
        let mut conn = self.pool.get().await?;

        articles::table
            .find(id)
            .first::<ArticleRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(Article::from))
    }

    /// Read side for downstream analysis: articles of one source within a
    /// published-date range, in published order.
    pub async fn by_source_and_range(
        &self,
        source_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Article>, DieselError> {
        let mut conn = self.pool.get().await?;

        // ISO dates compare correctly as text.
        let start = start.format("%Y-%m-%d").to_string();
        let end = end.format("%Y-%m-%d").to_string();

        articles::table
            .filter(articles::source_id.eq(source_id))
            .filter(articles::published_date.ge(start))
            .filter(articles::published_date.le(end))
            .order(articles::published_date.asc())
            .load::<ArticleRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(Article::from).collect())
    }

    /// Number of stored articles for one source.
    pub async fn count_for_source(&self, source_id: &str) -> Result<i64, DieselError> {
        let mut conn = self.pool.get().await?;

        use diesel::dsl::count_star;
        articles::table
            .filter(articles::source_id.eq(source_id))
            .select(count_star())
            .first(&mut conn)
            .await
    }

    async fn find_by_url_or_hash(
        &self,
        url: &str,
        hash: &str,
    ) -> Result<Option<Article>, DieselError> {
        let mut conn = self.pool.get().await?;

        articles::table
            .filter(articles::url.eq(url).or(articles::content_hash.eq(hash)))
            .first::<ArticleRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(Article::from))
    }
}
