//! Per-site extraction strategy plugged into the generic crawler.
//!
//! The three agency sites share almost all control flow; what differs is
//! where listing rows live, how dates are written, and which content region
//! holds the release body. Each of those quirks is one small [`SiteAdapter`]
//! implementation.

use chrono::{DateTime, NaiveDate};
use ego_tree::NodeRef;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

use crate::config::{ScrapingConfig, SourceConfig};

/// One entry on a listing page.
#[derive(Debug, Clone)]
pub struct ListingRow {
    pub title: String,
    pub url: String,
    /// Date as shown on the listing; detail-page extraction fills gaps.
    pub published_date: Option<NaiveDate>,
    /// Agency release number, when the listing carries one.
    pub release_number: Option<String>,
}

/// Elements whose subtrees never contribute to article content.
const STRIP_TAGS: &[&str] = &["script", "style", "nav", "aside", "footer", "header"];

/// Widget classes stripped from content regions before measuring length.
const STRIP_CLASSES: &[&str] = &["social-share", "related-links", "tags", "breadcrumb"];

/// Date selectors that work across the Drupal-based agency sites.
const DATE_SELECTORS: &[&str] = &["time[datetime]", ".date-display-single", ".submitted"];

/// Per-site extraction capability.
///
/// Implementations are stateless; all page I/O happens in the crawler.
pub trait SiteAdapter: Send + Sync {
    /// Category label stamped on every article from this site.
    fn category(&self) -> &'static str;

    /// Listing URL when the source config doesn't override it.
    fn default_listing_url(&self) -> &'static str;

    /// Server-side date-filtered listing URLs covering [start, end].
    ///
    /// Empty means the site offers no usable filter and the crawler goes
    /// straight to fallback pagination.
    fn filter_urls(&self, listing_url: &str, start: NaiveDate, end: NaiveDate) -> Vec<String>;

    /// Parse listing rows out of one page of HTML.
    fn parse_listing(&self, html: &str, base_url: &str) -> Vec<ListingRow>;

    /// Content-region selectors, most specific first.
    fn content_selectors(&self) -> &'static [&'static str];

    /// Resolved listing URL for a source.
    fn listing_url(&self, source: &SourceConfig) -> String {
        source
            .press_releases_url
            .clone()
            .unwrap_or_else(|| self.default_listing_url().to_string())
    }

    /// URL of the nth page of a listing. Page 0 is the listing itself.
    fn page_url(&self, base: &str, page: usize) -> String {
        if page == 0 {
            base.to_string()
        } else {
            let sep = if base.contains('?') { '&' } else { '?' };
            format!("{base}{sep}page={page}")
        }
    }

    /// Extract the release body from a detail page.
    ///
    /// Tries each content selector in order, strips unwanted substructure,
    /// and accepts the first region whose cleaned text exceeds the "good"
    /// length. Anything below the minimum length is rejected outright.
    fn extract_content(&self, html: &str, config: &ScrapingConfig) -> Option<String> {
        let doc = Html::parse_document(html);
        let mut fallback: Option<String> = None;

        for raw in self.content_selectors() {
            let Ok(selector) = Selector::parse(raw) else {
                continue;
            };
            if let Some(region) = doc.select(&selector).next() {
                let text = stripped_text(region);
                // length bounds are in characters, not bytes
                if text.chars().count() > config.good_content_len {
                    return Some(text);
                }
                if !text.is_empty() {
                    fallback = Some(text);
                }
            }
        }

        fallback.filter(|t| t.chars().count() >= config.min_content_len)
    }

    /// Extract a publish date from a detail page.
    fn extract_date(&self, html: &str) -> Option<NaiveDate> {
        let doc = Html::parse_document(html);
        for raw in DATE_SELECTORS {
            let Ok(selector) = Selector::parse(raw) else {
                continue;
            };
            if let Some(el) = doc.select(&selector).next() {
                let raw_date = el
                    .value()
                    .attr("datetime")
                    .map(str::to_string)
                    .unwrap_or_else(|| el.text().collect());
                if let Some(date) = parse_flexible_date(&raw_date) {
                    return Some(date);
                }
            }
        }
        None
    }
}

/// Collapse runs of whitespace into single spaces.
pub fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text content of an element with unwanted subtrees stripped out.
pub fn stripped_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_text(*element, &mut out);
    clean_text(&out)
}

fn collect_text(node: NodeRef<'_, Node>, out: &mut String) {
    for child in node.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(el) => {
                if STRIP_TAGS.contains(&el.name()) {
                    continue;
                }
                if el.classes().any(|c| STRIP_CLASSES.contains(&c)) {
                    continue;
                }
                collect_text(child, out);
            }
            _ => {}
        }
    }
}

/// Resolve a possibly-relative href against a base URL.
pub fn resolve_url(base: &str, href: &str) -> Option<String> {
    Url::parse(base).ok()?.join(href).ok().map(|u| {
        let mut s = u.to_string();
        // fragments never identify distinct releases
        if let Some(idx) = s.find('#') {
            s.truncate(idx);
        }
        s
    })
}

/// Parse the date formats the agency sites actually emit.
pub fn parse_flexible_date(raw: &str) -> Option<NaiveDate> {
    let s = clean_text(raw);
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return Some(dt.date_naive());
    }
    // leading date of a datetime attribute like 2024-01-05T13:45:00
    if let Some(prefix) = s.get(..10) {
        if let Ok(d) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return Some(d);
        }
    }

    // "Oct. 30, 2015" and "October 30, 2015" variants
    let depunctuated = s.replace('.', "");
    for (candidate, fmt) in [
        (s.as_str(), "%B %d, %Y"),
        (depunctuated.as_str(), "%b %d, %Y"),
        (s.as_str(), "%m/%d/%Y"),
    ] {
        if let Ok(d) = NaiveDate::parse_from_str(candidate, fmt) {
            return Some(d);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flexible_date_handles_site_formats() {
        let expected = NaiveDate::from_ymd_opt(2015, 10, 30).unwrap();
        assert_eq!(
            parse_flexible_date("2015-10-30T13:45:00Z"),
            Some(expected)
        );
        assert_eq!(parse_flexible_date("2015-10-30"), Some(expected));
        assert_eq!(parse_flexible_date("October 30, 2015"), Some(expected));
        assert_eq!(parse_flexible_date("Oct. 30, 2015"), Some(expected));
        assert_eq!(parse_flexible_date("10/30/2015"), Some(expected));
        assert_eq!(parse_flexible_date("sometime last week"), None);
        assert_eq!(parse_flexible_date(""), None);
    }

    #[test]
    fn stripped_text_drops_nav_and_widgets() {
        let html = r#"
            <div id="body">
                <p>Acme Corp agreed to pay a penalty.</p>
                <nav><a href="/">Home</a></nav>
                <div class="social-share">Share this</div>
                <div class="related-links"><a href="/other">Other case</a></div>
                <p>The settlement resolves all claims.</p>
            </div>
        "#;
        let doc = Html::parse_fragment(html);
        let selector = Selector::parse("#body").unwrap();
        let el = doc.select(&selector).next().unwrap();

        let text = stripped_text(el);
        assert!(text.contains("agreed to pay a penalty"));
        assert!(text.contains("resolves all claims"));
        assert!(!text.contains("Home"));
        assert!(!text.contains("Share this"));
        assert!(!text.contains("Other case"));
    }

    struct BodyOnly;

    impl SiteAdapter for BodyOnly {
        fn category(&self) -> &'static str {
            "Test Press Release"
        }

        fn default_listing_url(&self) -> &'static str {
            "https://agency.test/press"
        }

        fn filter_urls(&self, _: &str, _: NaiveDate, _: NaiveDate) -> Vec<String> {
            Vec::new()
        }

        fn parse_listing(&self, _: &str, _: &str) -> Vec<ListingRow> {
            Vec::new()
        }

        fn content_selectors(&self) -> &'static [&'static str] {
            &["#body"]
        }
    }

    #[test]
    fn content_length_bounds_count_characters_not_bytes() {
        let config = ScrapingConfig::default();

        // 30 two-byte characters: 60 bytes, but under the 50-char minimum
        let short = format!("<div id=\"body\">{}</div>", "é".repeat(30));
        assert_eq!(BodyOnly.extract_content(&short, &config), None);

        let long = format!("<div id=\"body\">{}</div>", "é".repeat(150));
        assert!(BodyOnly.extract_content(&long, &config).is_some());
    }

    #[test]
    fn resolve_url_joins_and_drops_fragments() {
        assert_eq!(
            resolve_url("https://www.justice.gov", "/opa/pr/acme-settles").as_deref(),
            Some("https://www.justice.gov/opa/pr/acme-settles")
        );
        assert_eq!(
            resolve_url("https://www.sec.gov/newsroom/", "press-releases/2015-249#top").as_deref(),
            Some("https://www.sec.gov/newsroom/press-releases/2015-249")
        );
    }
}
