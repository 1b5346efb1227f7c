//! Scraping log repository: the audit trail for scraping runs.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use super::pool::{AsyncSqlitePool, DieselError};
use super::records::ScrapingLogRecord;
use super::retry::{execute_with_retry, RetryPolicy};
use super::{parse_datetime, parse_datetime_opt};
use crate::models::{ScrapeStatus, ScrapingLog};
use crate::schema::scraping_logs;

impl From<ScrapingLogRecord> for ScrapingLog {
    fn from(record: ScrapingLogRecord) -> Self {
        ScrapingLog {
            status: ScrapeStatus::from_str(&record.status).unwrap_or(ScrapeStatus::Failed),
            id: record.id,
            source_id: record.source_id,
            started_at: parse_datetime(&record.started_at),
            completed_at: parse_datetime_opt(record.completed_at.as_deref()),
            articles_found: record.articles_found,
            articles_new: record.articles_new,
            error_message: record.error_message,
        }
    }
}

/// Repository for scraping run logs.
#[derive(Clone)]
pub struct ScrapingLogRepository {
    pool: AsyncSqlitePool,
    retry: RetryPolicy,
}

impl ScrapingLogRepository {
    pub fn new(pool: AsyncSqlitePool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }

    /// Open a new log entry in the running state and return its id.
    pub async fn start(&self, source_id: &str) -> Result<String, DieselError> {
        let id = Uuid::new_v4().to_string();
        let started_at = Utc::now().to_rfc3339();

        execute_with_retry(&self.retry, || {
            let id = id.clone();
            let started_at = started_at.clone();
            async move {
                let mut conn = self.pool.get().await?;

                diesel::insert_into(scraping_logs::table)
                    .values((
                        scraping_logs::id.eq(&id),
                        scraping_logs::source_id.eq(source_id),
                        scraping_logs::started_at.eq(&started_at),
                        scraping_logs::status.eq(ScrapeStatus::Running.as_str()),
                        scraping_logs::articles_found.eq(0),
                        scraping_logs::articles_new.eq(0),
                    ))
                    .execute(&mut conn)
                    .await?;
                Ok(())
            }
        })
        .await?;

        Ok(id)
    }

    /// Close a log entry as completed with its final counters.
    pub async fn complete(
        &self,
        id: &str,
        articles_found: i32,
        articles_new: i32,
    ) -> Result<(), DieselError> {
        let completed_at = Utc::now().to_rfc3339();

        execute_with_retry(&self.retry, || {
            let completed_at = completed_at.clone();
            async move {
                let mut conn = self.pool.get().await?;

                diesel::update(scraping_logs::table.find(id))
                    .set((
                        scraping_logs::status.eq(ScrapeStatus::Completed.as_str()),
                        scraping_logs::completed_at.eq(&completed_at),
                        scraping_logs::articles_found.eq(articles_found),
                        scraping_logs::articles_new.eq(articles_new),
                    ))
                    .execute(&mut conn)
                    .await?;
                Ok(())
            }
        })
        .await
    }

    /// Close a log entry as failed with the error message.
    pub async fn fail(&self, id: &str, error: &str) -> Result<(), DieselError> {
        let completed_at = Utc::now().to_rfc3339();

        execute_with_retry(&self.retry, || {
            let completed_at = completed_at.clone();
            async move {
                let mut conn = self.pool.get().await?;

                diesel::update(scraping_logs::table.find(id))
                    .set((
                        scraping_logs::status.eq(ScrapeStatus::Failed.as_str()),
                        scraping_logs::completed_at.eq(&completed_at),
                        scraping_logs::error_message.eq(error),
                    ))
                    .execute(&mut conn)
                    .await?;
                Ok(())
            }
        })
        .await
    }

    /// Get a log entry by id.
    pub async fn get(&self, id: &str) -> Result<Option<ScrapingLog>, DieselError> {
        let mut conn = self.pool.get().await?;

        scraping_logs::table
            .find(id)
            .first::<ScrapingLogRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(ScrapingLog::from))
    }

    /// Most recent log entries, newest first.
    pub async fn recent(&self, limit: i64) -> Result<Vec<ScrapingLog>, DieselError> {
        let mut conn = self.pool.get().await?;

        scraping_logs::table
            .order(scraping_logs::started_at.desc())
            .limit(limit)
            .load::<ScrapingLogRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(ScrapingLog::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::DbContext;
    use tempfile::tempdir;

    #[tokio::test]
    async fn log_lifecycle_completed() {
        let dir = tempdir().unwrap();
        let ctx = DbContext::new(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        let repo = ctx.scraping_logs();

        let id = repo.start("doj").await.unwrap();
        let log = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(log.status, ScrapeStatus::Running);
        assert!(log.completed_at.is_none());

        repo.complete(&id, 25, 7).await.unwrap();
        let log = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(log.status, ScrapeStatus::Completed);
        assert_eq!(log.articles_found, 25);
        assert_eq!(log.articles_new, 7);
        assert!(log.completed_at.is_some());
        assert!(log.error_message.is_none());
    }

    #[tokio::test]
    async fn log_lifecycle_failed() {
        let dir = tempdir().unwrap();
        let ctx = DbContext::new(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        let repo = ctx.scraping_logs();

        let id = repo.start("sec").await.unwrap();
        repo.fail(&id, "listing page returned 503").await.unwrap();

        let log = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(log.status, ScrapeStatus::Failed);
        assert_eq!(log.error_message.as_deref(), Some("listing page returned 503"));
        assert!(log.completed_at.is_some());
    }

    #[tokio::test]
    async fn recent_orders_newest_first() {
        let dir = tempdir().unwrap();
        let ctx = DbContext::new(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        let repo = ctx.scraping_logs();

        let first = repo.start("doj").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = repo.start("sec").await.unwrap();

        let logs = repo.recent(10).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].id, second);
        assert_eq!(logs[1].id, first);
    }
}
