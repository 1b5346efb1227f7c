//! Commodity Futures Trading Commission press release adapter.
//!
//! CFTC listings are a Bootstrap table (date | title | release number) and
//! the site filters by year only.

use chrono::{Datelike, NaiveDate};
use scraper::{ElementRef, Html, Selector};

use crate::scrapers::adapter::{
    clean_text, parse_flexible_date, resolve_url, ListingRow, SiteAdapter,
};

pub struct CftcAdapter;

impl SiteAdapter for CftcAdapter {
    fn category(&self) -> &'static str {
        "CFTC Press Release"
    }

    fn default_listing_url(&self) -> &'static str {
        "https://www.cftc.gov/PressRoom/PressReleases"
    }

    fn filter_urls(&self, listing_url: &str, start: NaiveDate, end: NaiveDate) -> Vec<String> {
        let sep = if listing_url.contains('?') { '&' } else { '?' };
        (start.year()..=end.year())
            .map(|year| {
                format!(
                    "{listing_url}{sep}combine=&field_press_release_types_value=All\
                     &field_release_number_value=&prtid=All&year={year}"
                )
            })
            .collect()
    }

    fn parse_listing(&self, html: &str, base_url: &str) -> Vec<ListingRow> {
        let doc = Html::parse_document(html);
        let row_selector =
            Selector::parse("table.table.table-hover.table-striped tbody tr")
                .expect("static selector");

        doc.select(&row_selector)
            .filter_map(|row| extract_row(row, base_url))
            .collect()
    }

    fn content_selectors(&self) -> &'static [&'static str] {
        &[
            ".field--name-body",
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
    let cell_selector = Selector::parse("td").expect("static selector");
    let cells: Vec<_> = row.select(&cell_selector).collect();
    if cells.len() < 2 {
        return None;
    }

    // the title is the first linked cell
    let link_selector = Selector::parse("a").expect("static selector");
    let link_el = cells
        .iter()
        .find_map(|cell| cell.select(&link_selector).next())?;

    let title = clean_text(&link_el.text().collect::<String>());
    if title.is_empty() {
        return None;
    }
    let url = resolve_url(base_url, link_el.value().attr("href")?)?;

    // date lives in the first cell
    let published_date = parse_flexible_date(&cells[0].text().collect::<String>());

    let release_number = (cells.len() > 2)
        .then(|| clean_text(&cells[cells.len() - 1].text().collect::<String>()))
        .filter(|s| !s.is_empty());

    Some(ListingRow {
        title,
        url,
        published_date,
        release_number,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <table class="table table-hover table-striped">
            <tbody>
                <tr>
                    <td>January 5, 2024</td>
                    <td><a href="/PressRoom/PressReleases/8850-24">CFTC Orders Delta Trading to Pay $2 Million</a></td>
                    <td>8850-24</td>
                </tr>
                <tr>
                    <td>January 2, 2024</td>
                    <td><a href="/PressRoom/PressReleases/8849-24">CFTC Charges Epsilon Capital</a></td>
                    <td>8849-24</td>
                </tr>
                <tr><td>spacer row</td></tr>
            </tbody>
        </table>
    "#;

    #[test]
    fn parses_table_rows() {
        let rows = CftcAdapter.parse_listing(LISTING, "https://www.cftc.gov");
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].title,
            "CFTC Orders Delta Trading to Pay $2 Million"
        );
        assert_eq!(
            rows[0].url,
            "https://www.cftc.gov/PressRoom/PressReleases/8850-24"
        );
        assert_eq!(
            rows[0].published_date,
            NaiveDate::from_ymd_opt(2024, 1, 5)
        );
        assert_eq!(rows[0].release_number.as_deref(), Some("8850-24"));
    }

    #[test]
    fn one_filter_url_per_year() {
        let urls = CftcAdapter.filter_urls(
            "https://www.cftc.gov/PressRoom/PressReleases",
            NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        );
        assert_eq!(urls.len(), 2);
        assert!(urls[0].contains("year=2023"));
        assert!(urls[1].contains("year=2024"));
    }
}
