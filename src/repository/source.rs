//! Source repository.
//!
//! Uses diesel-async's SyncConnectionWrapper to provide an async interface
//! while keeping Diesel's compile-time query checking.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::pool::{AsyncSqlitePool, DieselError};
use super::records::SourceRecord;
use super::retry::{execute_with_retry, RetryPolicy};
use super::parse_datetime;
use crate::models::{ScraperType, Source};
use crate::schema::sources;

impl From<SourceRecord> for Source {
    fn from(record: SourceRecord) -> Self {
        Source {
            scraper_type: ScraperType::from_str(&record.scraper_type)
                .unwrap_or(ScraperType::Doj),
            id: record.id,
            name: record.name,
            base_url: record.base_url,
            enabled: record.enabled != 0,
            created_at: parse_datetime(&record.created_at),
            updated_at: parse_datetime(&record.updated_at),
        }
    }
}

/// Repository for configured sources.
#[derive(Clone)]
pub struct SourceRepository {
    pool: AsyncSqlitePool,
    retry: RetryPolicy,
}

impl SourceRepository {
    pub fn new(pool: AsyncSqlitePool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }

    /// Get a source by ID.
    pub async fn get(&self, id: &str) -> Result<Option<Source>, DieselError> {
        let mut conn = self.pool.get().await?;

        sources::table
            .find(id)
            .first::<SourceRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(Source::from))
    }

    /// Get all sources.
    pub async fn get_all(&self) -> Result<Vec<Source>, DieselError> {
        let mut conn = self.pool.get().await?;

        sources::table
            .order(sources::id.asc())
            .load::<SourceRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(Source::from).collect())
    }

    /// Save a source (insert or update).
    pub async fn save(&self, source: &Source) -> Result<(), DieselError> {
        let created_at = source.created_at.to_rfc3339();
        let updated_at = Utc::now().to_rfc3339();
        let scraper_type = source.scraper_type.as_str();

        execute_with_retry(&self.retry, || {
            let created_at = created_at.clone();
            let updated_at = updated_at.clone();
            async move {
                let mut conn = self.pool.get().await?;

                // replace_into is the SQLite upsert
                diesel::replace_into(sources::table)
                    .values((
                        sources::id.eq(&source.id),
                        sources::name.eq(&source.name),
                        sources::base_url.eq(&source.base_url),
                        sources::scraper_type.eq(scraper_type),
                        sources::enabled.eq(source.enabled as i32),
                        sources::created_at.eq(&created_at),
                        sources::updated_at.eq(&updated_at),
                    ))
                    .execute(&mut conn)
                    .await?;
                Ok(())
            }
        })
        .await
    }

    /// Check if a source exists.
    pub async fn exists(&self, id: &str) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;

        use diesel::dsl::count_star;
        let count: i64 = sources::table
            .filter(sources::id.eq(id))
            .select(count_star())
            .first(&mut conn)
            .await?;

        Ok(count > 0)
    }

    /// Enable or disable a source.
    pub async fn set_enabled(&self, id: &str, enabled: bool) -> Result<(), DieselError> {
        let updated_at = Utc::now().to_rfc3339();

        execute_with_retry(&self.retry, || {
            let updated_at = updated_at.clone();
            async move {
                let mut conn = self.pool.get().await?;

                diesel::update(sources::table.find(id))
                    .set((
                        sources::enabled.eq(enabled as i32),
                        sources::updated_at.eq(&updated_at),
                    ))
                    .execute(&mut conn)
                    .await?;
                Ok(())
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::DbContext;
    use tempfile::tempdir;

    #[tokio::test]
    async fn source_crud() {
        let dir = tempdir().unwrap();
        let ctx = DbContext::new(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        let repo = ctx.sources();

        let source = Source::new(
            "doj".to_string(),
            "Department of Justice".to_string(),
            "https://www.justice.gov".to_string(),
            ScraperType::Doj,
        );

        repo.save(&source).await.unwrap();
        assert!(repo.exists("doj").await.unwrap());

        let fetched = repo.get("doj").await.unwrap().unwrap();
        assert_eq!(fetched.name, "Department of Justice");
        assert_eq!(fetched.scraper_type, ScraperType::Doj);
        assert!(fetched.enabled);

        repo.set_enabled("doj", false).await.unwrap();
        let fetched = repo.get("doj").await.unwrap().unwrap();
        assert!(!fetched.enabled);

        assert_eq!(repo.get_all().await.unwrap().len(), 1);
        assert!(repo.get("sec").await.unwrap().is_none());
    }
}
