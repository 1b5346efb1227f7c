//! Deterministic content fingerprinting for article deduplication.
//!
//! The fingerprint covers the case-normalized title, a fixed-length prefix of
//! the content, and the URL, so re-ingesting an unchanged press release
//! always produces the same hash.

use sha2::{Digest, Sha256};

/// Content prefix length (chars) included in the fingerprint.
pub const CONTENT_PREFIX_LEN: usize = 1000;

/// Compute the dedup hash for an article.
pub fn content_hash(title: &str, content: &str, url: &str) -> String {
    let prefix: String = content.trim().chars().take(CONTENT_PREFIX_LEN).collect();
    let combined = format!("{}|{}|{}", normalize_title(title), prefix, url.trim());
    let digest = Sha256::digest(combined.as_bytes());
    hex::encode(digest)
}

/// Normalize a title for hashing and existence pre-checks.
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let a = content_hash("Acme Corp Settles Claims", "Full release text.", "https://x/1");
        let b = content_hash("Acme Corp Settles Claims", "Full release text.", "https://x/1");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn title_case_and_whitespace_do_not_change_hash() {
        let a = content_hash("Acme Corp Settles Claims", "body", "https://x/1");
        let b = content_hash("  ACME CORP SETTLES CLAIMS  ", "body", "https://x/1");
        assert_eq!(a, b);
    }

    #[test]
    fn url_is_part_of_the_hash() {
        let a = content_hash("t", "body", "https://x/1");
        let b = content_hash("t", "body", "https://x/2");
        assert_ne!(a, b);
    }

    #[test]
    fn only_content_prefix_matters() {
        let base = "x".repeat(CONTENT_PREFIX_LEN);
        let a = content_hash("t", &format!("{base}tail one"), "https://x/1");
        let b = content_hash("t", &format!("{base}tail two"), "https://x/1");
        assert_eq!(a, b);

        let c = content_hash("t", &base[..CONTENT_PREFIX_LEN - 1], "https://x/1");
        assert_ne!(a, c);
    }

    #[test]
    fn prefix_respects_char_boundaries() {
        // Multi-byte characters must not panic the truncation.
        let content = "é".repeat(CONTENT_PREFIX_LEN + 10);
        let _ = content_hash("t", &content, "https://x/1");
    }
}
