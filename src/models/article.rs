//! Article model: one normalized, deduplicated press release.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::fingerprint;

/// A persisted press release record.
///
/// Created exactly once per unique (url, content_hash) pair and never mutated
/// by the ingestion pipeline afterwards. Downstream analysis reads these rows
/// but owns none of the fields written here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub source_id: String,
    pub title: String,
    pub content: String,
    /// Globally unique canonical URL.
    pub url: String,
    /// Deterministic fingerprint over (normalized title, content prefix, url).
    pub content_hash: String,
    pub published_date: NaiveDate,
    pub scraped_at: DateTime<Utc>,
    pub author: Option<String>,
    pub category: Option<String>,
    /// Ordered tag list.
    pub tags: Vec<String>,
    pub word_count: i32,
}

impl Article {
    /// Build an article from a scraped candidate, computing the fingerprint
    /// and word count.
    pub fn from_candidate(source_id: &str, candidate: crate::scrapers::ArticleCandidate) -> Self {
        let content_hash =
            fingerprint::content_hash(&candidate.title, &candidate.content, &candidate.url);
        let word_count = candidate.content.split_whitespace().count() as i32;
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source_id: source_id.to_string(),
            title: candidate.title,
            content: candidate.content,
            url: candidate.url,
            content_hash,
            published_date: candidate.published_date,
            scraped_at: Utc::now(),
            author: candidate.author,
            category: candidate.category,
            tags: candidate.tags,
            word_count,
        }
    }
}
