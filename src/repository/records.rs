//! Diesel ORM records for database tables.
//!
//! These structs provide compile-time type checking for queries; conversion
//! to and from domain models lives in the individual repositories.

use diesel::prelude::*;

use crate::schema;

/// Source record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::sources)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SourceRecord {
    pub id: String,
    pub name: String,
    pub base_url: String,
    pub scraper_type: String,
    pub enabled: i32,
    pub created_at: String,
    pub updated_at: String,
}

/// Article record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::articles)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ArticleRecord {
    pub id: String,
    pub source_id: String,
    pub title: String,
    pub content: String,
    pub url: String,
    pub content_hash: String,
    pub published_date: String,
    pub scraped_at: String,
    pub author: Option<String>,
    pub category: Option<String>,
    pub tags: String,
    pub word_count: i32,
}

/// New article for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::articles)]
pub struct NewArticle<'a> {
    pub id: &'a str,
    pub source_id: &'a str,
    pub title: &'a str,
    pub content: &'a str,
    pub url: &'a str,
    pub content_hash: &'a str,
    pub published_date: &'a str,
    pub scraped_at: &'a str,
    pub author: Option<&'a str>,
    pub category: Option<&'a str>,
    pub tags: &'a str,
    pub word_count: i32,
}

/// Scraping log record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::scraping_logs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ScrapingLogRecord {
    pub id: String,
    pub source_id: String,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub status: String,
    pub articles_found: i32,
    pub articles_new: i32,
    pub error_message: Option<String>,
}
