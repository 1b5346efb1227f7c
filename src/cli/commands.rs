//! CLI command implementations.

use std::sync::Arc;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use console::style;

use super::helpers::truncate;
use crate::config::Settings;
use crate::manager::{DefaultPageSourceFactory, FetchBackend, ScrapeSummary, ScraperManager};
use crate::models::Source;
use crate::repository::DbContext;

/// Initialize the data directory and database, seeding configured sources.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    std::fs::create_dir_all(&settings.data_dir)
        .with_context(|| format!("creating {}", settings.data_dir.display()))?;

    let ctx = DbContext::new(&settings.database_path());
    ctx.init_schema().await?;
    let sources = ctx.sources();

    let mut added = 0;
    for cfg in &settings.sources {
        if !sources.exists(&cfg.id).await? {
            let source = Source::new(
                cfg.id.clone(),
                cfg.name.clone(),
                cfg.base_url.clone(),
                cfg.scraper_type,
            );
            sources.save(&source).await?;
            added += 1;
            println!("  {} Added source: {}", style("✓").green(), source.name);
        }
    }

    if added == 0 {
        println!("  All configured sources already present");
    }

    println!(
        "{} Initialized presswatch in {}",
        style("✓").green(),
        settings.data_dir.display()
    );
    Ok(())
}

/// List configured sources.
pub async fn cmd_source_list(settings: &Settings, format: &str) -> anyhow::Result<()> {
    let ctx = DbContext::new(&settings.database_path());
    let sources = ctx.sources().get_all().await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&sources)?);
        return Ok(());
    }

    if sources.is_empty() {
        println!(
            "{} No sources in database. Run 'presswatch init' first.",
            style("!").yellow()
        );
        return Ok(());
    }

    println!("\n{}", style("Press Release Sources").bold());
    println!("{}", "-".repeat(70));
    println!("{:<8} {:<40} {:<8} Enabled", "ID", "Name", "Type");
    println!("{}", "-".repeat(70));
    for source in sources {
        println!(
            "{:<8} {:<40} {:<8} {}",
            source.id,
            truncate(&source.name, 39),
            source.scraper_type.as_str(),
            if source.enabled { "yes" } else { "no" }
        );
    }
    Ok(())
}

/// Enable or disable a source.
pub async fn cmd_source_set_enabled(
    settings: &Settings,
    source_id: &str,
    enabled: bool,
) -> anyhow::Result<()> {
    let ctx = DbContext::new(&settings.database_path());
    let sources = ctx.sources();

    if !sources.exists(source_id).await? {
        println!("{} Source '{}' not found", style("✗").red(), source_id);
        return Ok(());
    }

    sources.set_enabled(source_id, enabled).await?;
    println!(
        "{} Source '{}' {}",
        style("✓").green(),
        source_id,
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}

/// Scrape press releases for the given sources and date range.
#[allow(clippy::too_many_arguments)]
pub async fn cmd_scrape(
    settings: &Settings,
    source_ids: &[String],
    all: bool,
    days: u32,
    from: Option<&str>,
    to: Option<&str>,
    no_browser: bool,
) -> anyhow::Result<()> {
    let ids: Vec<String> = if all {
        settings.sources.iter().map(|s| s.id.clone()).collect()
    } else if source_ids.is_empty() {
        anyhow::bail!("specify source IDs or use --all");
    } else {
        source_ids.to_vec()
    };

    let backend = if no_browser {
        FetchBackend::Http
    } else {
        FetchBackend::Browser
    };

    let ctx = DbContext::new(&settings.database_path());
    let factory = DefaultPageSourceFactory::new(
        backend,
        settings.browser.clone(),
        settings.scraping.clone(),
    );
    let manager = ScraperManager::new(
        settings.sources.clone(),
        ctx,
        settings.scraping.clone(),
        Box::new(factory),
    )
    .with_progress(Arc::new(|msg: &str| println!("  {msg}")));

    let summary = match (from, to) {
        (None, None) => manager_scrape_recent(&manager, &ids, days).await,
        (from, to) => {
            let end = match to {
                Some(raw) => parse_date(raw)?,
                None => Utc::now().date_naive(),
            };
            let start = match from {
                Some(raw) => parse_date(raw)?,
                None => anyhow::bail!("--to requires --from"),
            };
            if start > end {
                anyhow::bail!("range start {start} is after end {end}");
            }
            manager.scrape_sources_range(&ids, start, end).await
        }
    };

    print_summary(&summary);
    Ok(())
}

async fn manager_scrape_recent(
    manager: &ScraperManager,
    ids: &[String],
    days: u32,
) -> ScrapeSummary {
    let end = Utc::now().date_naive();
    let start = end - chrono::Duration::days(days as i64);
    manager.scrape_sources_range(ids, start, end).await
}

fn parse_date(raw: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{raw}', expected YYYY-MM-DD"))
}

fn print_summary(summary: &ScrapeSummary) {
    println!("\n{}", style("Scrape Summary").bold());
    println!("{}", "-".repeat(60));
    for source in &summary.sources {
        match &source.error {
            Some(error) => println!(
                "{:<8} {} {}",
                source.source_id,
                style("failed").red(),
                truncate(error, 40)
            ),
            None => println!(
                "{:<8} {} new, {} duplicates, {} total",
                source.source_id,
                style(source.new_articles).green(),
                source.duplicate_articles,
                source.total_articles
            ),
        }
    }
    println!("{}", "-".repeat(60));
    println!(
        "Total: {} new, {} duplicates, {} articles",
        summary.total_new(),
        summary.total_duplicates(),
        summary.total_articles()
    );
}

/// Show recent runs and per-source article counts.
pub async fn cmd_status(settings: &Settings) -> anyhow::Result<()> {
    let ctx = DbContext::new(&settings.database_path());
    let sources = ctx.sources().get_all().await?;
    let articles = ctx.articles();

    println!("\n{}", style("Articles").bold());
    println!("{}", "-".repeat(40));
    for source in &sources {
        let count = articles.count_for_source(&source.id).await?;
        println!("{:<8} {:>8}", source.id, count);
    }

    let logs = ctx.scraping_logs().recent(10).await?;
    println!("\n{}", style("Recent Runs").bold());
    println!("{}", "-".repeat(70));
    if logs.is_empty() {
        println!("No scraping runs recorded yet.");
        return Ok(());
    }
    println!(
        "{:<8} {:<18} {:<10} {:>6} {:>6}  Error",
        "Source", "Started", "Status", "Found", "New"
    );
    for log in logs {
        println!(
            "{:<8} {:<18} {:<10} {:>6} {:>6}  {}",
            log.source_id,
            log.started_at.format("%Y-%m-%d %H:%M"),
            log.status.as_str(),
            log.articles_found,
            log.articles_new,
            log.error_message.as_deref().map(|e| truncate(e, 30)).unwrap_or_default()
        );
    }
    Ok(())
}
