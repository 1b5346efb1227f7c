//! Site adapters for the supported agencies.

mod cftc;
mod doj;
mod sec;

pub use cftc::CftcAdapter;
pub use doj::DojAdapter;
pub use sec::SecAdapter;

use super::SiteAdapter;
use crate::models::ScraperType;

/// Adapter for a configured scraper type.
pub fn adapter_for(scraper_type: ScraperType) -> Box<dyn SiteAdapter> {
    match scraper_type {
        ScraperType::Doj => Box::new(DojAdapter),
        ScraperType::Sec => Box::new(SecAdapter),
        ScraperType::Cftc => Box::new(CftcAdapter),
    }
}
