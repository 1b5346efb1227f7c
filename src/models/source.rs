//! Source models for press release sites.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which site-specific scraper drives a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScraperType {
    Doj,
    Sec,
    Cftc,
}

impl ScraperType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Doj => "doj",
            Self::Sec => "sec",
            Self::Cftc => "cftc",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "doj" => Some(Self::Doj),
            "sec" => Some(Self::Sec),
            "cftc" => Some(Self::Cftc),
            _ => None,
        }
    }
}

/// A configured agency site the pipeline is allowed to crawl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    /// Unique identifier for this source (slug, e.g. "doj").
    pub id: String,
    /// Human-readable agency name.
    pub name: String,
    /// Base URL for resolving relative links.
    pub base_url: String,
    /// Which adapter drives this source.
    pub scraper_type: ScraperType,
    /// Whether the source participates in scraping runs.
    pub enabled: bool,
    /// When the source was added.
    pub created_at: DateTime<Utc>,
    /// When the source row was last changed.
    pub updated_at: DateTime<Utc>,
}

impl Source {
    /// Create a new source.
    pub fn new(id: String, name: String, base_url: String, scraper_type: ScraperType) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            base_url,
            scraper_type,
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scraper_type_round_trips() {
        for ty in [ScraperType::Doj, ScraperType::Sec, ScraperType::Cftc] {
            assert_eq!(ScraperType::from_str(ty.as_str()), Some(ty));
        }
        assert_eq!(ScraperType::from_str("fda"), None);
    }
}
