//! Department of Justice press release adapter.
//!
//! The DOJ site is Drupal: listings are `views-row` divs, and the news
//! search form exposes its date filter as plain query parameters.

use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};

use crate::scrapers::adapter::{
    clean_text, parse_flexible_date, resolve_url, ListingRow, SiteAdapter,
};

pub struct DojAdapter;

const ROW_SELECTORS: &str = "div.views-row, article.node";

const TITLE_SELECTORS: &[&str] = &[
    "h3.node__title",
    "h2.node__title",
    "h3",
    "h2",
    "a.node__title-link",
];

const ROW_DATE_SELECTORS: &[&str] = &[
    "time[datetime]",
    ".date-display-single",
    ".submitted",
    ".node__meta time",
    ".field--name-created time",
];

impl SiteAdapter for DojAdapter {
    fn category(&self) -> &'static str {
        "DOJ Press Release"
    }

    fn default_listing_url(&self) -> &'static str {
        "https://www.justice.gov/news/press-releases"
    }

    fn filter_urls(&self, listing_url: &str, start: NaiveDate, end: NaiveDate) -> Vec<String> {
        // MM/DD/YYYY, the format the news search form submits
        let sep = if listing_url.contains('?') { '&' } else { '?' };
        vec![format!(
            "{listing_url}{sep}start_date={}&end_date={}",
            start.format("%m/%d/%Y"),
            end.format("%m/%d/%Y"),
        )]
    }

    fn parse_listing(&self, html: &str, base_url: &str) -> Vec<ListingRow> {
        let doc = Html::parse_document(html);
        let row_selector = Selector::parse(ROW_SELECTORS).expect("static selector");

        doc.select(&row_selector)
            .filter_map(|row| extract_row(row, base_url))
            .collect()
    }

    fn content_selectors(&self) -> &'static [&'static str] {
        &[
            ".field--name-body",
            ".field--name-field-pr-body",
            ".node-content",
            ".region-content",
            "#main-content",
            ".page-content",
            "main",
            "article .content",
        ]
    }
}

fn extract_row(row: ElementRef<'_>, base_url: &str) -> Option<ListingRow> {
    let title_el = TITLE_SELECTORS.iter().find_map(|raw| {
        let selector = Selector::parse(raw).ok()?;
        row.select(&selector).next()
    })?;

    // the heading may be the link itself or wrap one
    let link_el = if title_el.value().name() == "a" {
        title_el
    } else {
        let a = Selector::parse("a").expect("static selector");
        title_el.select(&a).next()?
    };

    let title = clean_text(&title_el.text().collect::<String>());
    if title.is_empty() {
        return None;
    }
    let url = resolve_url(base_url, link_el.value().attr("href")?)?;

    let published_date = ROW_DATE_SELECTORS.iter().find_map(|raw| {
        let selector = Selector::parse(raw).ok()?;
        let el = row.select(&selector).next()?;
        let raw_date = el
            .value()
            .attr("datetime")
            .map(str::to_string)
            .unwrap_or_else(|| el.text().collect());
        parse_flexible_date(&raw_date)
    });

    Some(ListingRow {
        title,
        url,
        published_date,
        release_number: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <div class="view-content">
            <div class="views-row">
                <h3 class="node__title"><a href="/opa/pr/acme-settles">Acme Corp Settles Claims</a></h3>
                <div class="node__meta"><time datetime="2024-01-05T10:00:00Z">January 5, 2024</time></div>
            </div>
            <div class="views-row">
                <h3 class="node__title"><a href="/opa/pr/beta-charged">Beta LLC Charged With Fraud</a></h3>
                <div class="node__meta"><time datetime="2024-01-03T10:00:00Z">January 3, 2024</time></div>
            </div>
            <div class="views-row">
                <h3 class="node__title">No link here</h3>
            </div>
        </div>
    "#;

    #[test]
    fn parses_listing_rows() {
        let rows = DojAdapter.parse_listing(LISTING, "https://www.justice.gov");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].title, "Acme Corp Settles Claims");
        assert_eq!(rows[0].url, "https://www.justice.gov/opa/pr/acme-settles");
        assert_eq!(
            rows[0].published_date,
            NaiveDate::from_ymd_opt(2024, 1, 5)
        );
        assert_eq!(
            rows[1].published_date,
            NaiveDate::from_ymd_opt(2024, 1, 3)
        );
    }

    #[test]
    fn filter_url_uses_form_date_format() {
        let urls = DojAdapter.filter_urls(
            "https://www.justice.gov/news/press-releases",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
        );
        assert_eq!(
            urls,
            vec![
                "https://www.justice.gov/news/press-releases?start_date=01/01/2024&end_date=01/07/2024"
            ]
        );
    }

    #[test]
    fn paginates_with_page_parameter() {
        let url = DojAdapter.page_url("https://www.justice.gov/news/press-releases", 0);
        assert_eq!(url, "https://www.justice.gov/news/press-releases");
        let url = DojAdapter.page_url("https://www.justice.gov/news/press-releases?x=1", 2);
        assert_eq!(url, "https://www.justice.gov/news/press-releases?x=1&page=2");
    }
}
