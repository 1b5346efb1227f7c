//! presswatch - enforcement-action press release ingestion.
//!
//! Scrapes press releases from agency websites (DOJ, SEC, CFTC), normalizes
//! them into deduplicated article records, and persists them in SQLite for
//! downstream analysis.

pub mod cli;
pub mod config;
pub mod fingerprint;
pub mod manager;
pub mod models;
pub mod repository;
pub mod schema;
pub mod scrapers;
