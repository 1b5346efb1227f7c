//! Securities and Exchange Commission press release adapter.
//!
//! SEC listings are table rows, and the site's filter works on year/month
//! pairs rather than a free date range, so one range maps to several
//! filtered URLs.

use chrono::{Datelike, NaiveDate};
use scraper::{ElementRef, Html, Selector};

use crate::scrapers::adapter::{
    clean_text, parse_flexible_date, resolve_url, ListingRow, SiteAdapter,
};

pub struct SecAdapter;

impl SiteAdapter for SecAdapter {
    fn category(&self) -> &'static str {
        "SEC Press Release"
    }

    fn default_listing_url(&self) -> &'static str {
        "https://www.sec.gov/newsroom/press-releases"
    }

    fn filter_urls(&self, listing_url: &str, start: NaiveDate, end: NaiveDate) -> Vec<String> {
        let sep = if listing_url.contains('?') { '&' } else { '?' };
        year_months(start, end)
            .into_iter()
            .map(|(year, month)| {
                format!(
                    "{listing_url}{sep}combine=&year={year}&month={month}\
                     &field_person_target_id=&speaker="
                )
            })
            .collect()
    }

    fn parse_listing(&self, html: &str, base_url: &str) -> Vec<ListingRow> {
        let doc = Html::parse_document(html);
        let row_selector = Selector::parse("tr.pr-list-page-row").expect("static selector");

        doc.select(&row_selector)
            .filter_map(|row| extract_row(row, base_url))
            .collect()
    }

    fn content_selectors(&self) -> &'static [&'static str] {
        &[
            ".field--name-body",
            ".field--name-field-display-title",
            ".node-content",
            ".region-content",
            "#main-content",
            ".page-content",
            "main",
            "article .content",
        ]
    }
}

/// Every (year, month) pair touched by [start, end], in order.
fn year_months(start: NaiveDate, end: NaiveDate) -> Vec<(i32, u32)> {
    let mut out = Vec::new();
    let (mut year, mut month) = (start.year(), start.month());
    while (year, month) <= (end.year(), end.month()) {
        out.push((year, month));
        month += 1;
        if month > 12 {
            month = 1;
            year += 1;
        }
    }
    out
}

fn extract_row(row: ElementRef<'_>, base_url: &str) -> Option<ListingRow> {
    let link_selector =
        Selector::parse(r#"a[href*="/newsroom/press-releases/"]"#).expect("static selector");
    let link_el = row.select(&link_selector).next()?;

    let title = clean_text(&link_el.text().collect::<String>());
    if title.is_empty() {
        return None;
    }
    let url = resolve_url(base_url, link_el.value().attr("href")?)?;

    let date_selector = Selector::parse("time.datetime").expect("static selector");
    let published_date = row.select(&date_selector).next().and_then(|el| {
        let raw = el
            .value()
            .attr("datetime")
            .map(str::to_string)
            .unwrap_or_else(|| el.text().collect());
        parse_flexible_date(&raw)
    });

    let release_selector =
        Selector::parse("td.views-field-field-release-number").expect("static selector");
    let release_number = row
        .select(&release_selector)
        .next()
        .map(|el| clean_text(&el.text().collect::<String>()))
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
        <table>
            <tbody>
                <tr class="pr-list-page-row">
                    <td><time datetime="2015-10-30T13:45:00Z" class="datetime">Oct. 30, 2015</time></td>
                    <td><a href="/newsroom/press-releases/2015-249" hreflang="en">SEC Adopts Rules to Permit Crowdfunding</a></td>
                    <td class="views-field-field-release-number">2015-249</td>
                </tr>
                <tr class="pr-list-page-row">
                    <td><time datetime="2015-10-28T09:00:00Z" class="datetime">Oct. 28, 2015</time></td>
                    <td><a href="/newsroom/press-releases/2015-247">SEC Charges Gamma Fund Advisers</a></td>
                    <td class="views-field-field-release-number">2015-247</td>
                </tr>
            </tbody>
        </table>
    "#;

    #[test]
    fn parses_table_rows() {
        let rows = SecAdapter.parse_listing(LISTING, "https://www.sec.gov");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].title, "SEC Adopts Rules to Permit Crowdfunding");
        assert_eq!(
            rows[0].url,
            "https://www.sec.gov/newsroom/press-releases/2015-249"
        );
        assert_eq!(
            rows[0].published_date,
            NaiveDate::from_ymd_opt(2015, 10, 30)
        );
        assert_eq!(rows[0].release_number.as_deref(), Some("2015-249"));
    }

    #[test]
    fn range_maps_to_year_month_pairs() {
        let urls = SecAdapter.filter_urls(
            "https://www.sec.gov/newsroom/press-releases",
            NaiveDate::from_ymd_opt(2023, 11, 15).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        );
        assert_eq!(urls.len(), 3);
        assert!(urls[0].contains("year=2023") && urls[0].contains("month=11"));
        assert!(urls[1].contains("year=2023") && urls[1].contains("month=12"));
        assert!(urls[2].contains("year=2024") && urls[2].contains("month=1"));
    }
}
