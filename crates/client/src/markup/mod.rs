//! Markup reduction for model consumption and selector evaluation.
//!
//! ### Reduction
//! - Comments are always removed.
//! - Noise tags and noise class/id regions are removed unless they carry a
//!   pagination signal, in which case only their non-pagination children go.
//! - Lone text runs in block elements are cut to 100 characters.
//! - Blank lines and surrounding whitespace are stripped.
//!
//! ### Failure semantics
//! [`reduce`] never fails: any internal error is logged and the raw markup is
//! returned unchanged.

pub mod links;
pub mod reduce;

pub use links::{Link, PageText, collapse_whitespace, extract_text_and_links};

use scout_core::hash::snapshot_key;
use thiserror::Error;
use url::Url;

/// Internal reduction failure. Never escapes [`reduce`].
#[derive(Debug, Error)]
pub enum ReduceError {
    #[error("invalid noise selector {selector}: {reason}")]
    Selector { selector: String, reason: String },
}

/// Reduce raw page markup, falling back to the input on any internal error.
pub fn reduce(raw_markup: &str) -> String {
    match try_reduce(raw_markup) {
        Ok(reduced) => reduced,
        Err(e) => {
            tracing::warn!(error = %e, "markup reduction failed, using raw markup");
            raw_markup.to_string()
        }
    }
}

/// Reduce raw page markup, surfacing internal errors.
pub fn try_reduce(raw_markup: &str) -> Result<String, ReduceError> {
    reduce::reduce_document(raw_markup)
}

/// Immutable view of one fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    pub url: Url,
    pub raw_markup: String,
    pub reduced_markup: String,
    pub visible_text: String,
    pub links: Vec<Link>,
}

impl PageSnapshot {
    /// Reduce `raw_markup` and derive text and links relative to `url`.
    pub fn capture(url: Url, raw_markup: String) -> Self {
        let reduced_markup = reduce(&raw_markup);
        let PageText { visible_text, links } = extract_text_and_links(&reduced_markup, &url);

        tracing::debug!(
            url = %url,
            raw_len = raw_markup.len(),
            reduced_len = reduced_markup.len(),
            links = links.len(),
            "captured page snapshot"
        );

        Self { url, raw_markup, reduced_markup, visible_text, links }
    }

    /// Session cache key: URL plus raw markup length.
    pub fn cache_key(&self) -> String {
        snapshot_key(self.url.as_str(), self.raw_markup.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_comments_and_scripts() {
        let reduced = reduce("<div><!-- note --><script>var x = 1;</script><p>Keep me</p></div>");
        assert!(!reduced.contains("note"));
        assert!(!reduced.contains("<script"));
        assert!(reduced.contains("Keep me"));
    }

    #[test]
    fn test_nav_with_page_link_survives() {
        let raw = r#"<div class="jobs">Listing</div><nav class="site-nav"><a href="/page=2">2</a></nav><nav class="top"><a href="/about">About</a></nav>"#;
        let reduced = reduce(raw);
        assert!(reduced.contains(r#"<a href="/page=2">2</a>"#));
        assert!(reduced.contains("site-nav"));
        assert!(!reduced.contains("About"));
        assert!(!reduced.contains(r#"class="top""#));
    }

    #[test]
    fn test_pagination_container_keeps_only_relevant_children() {
        let raw = r#"<footer><ul class="pagination"><li class="page-item"><a href="?p=2">2</a></li></ul><div class="legal">Copyright Acme Corporation and affiliates</div></footer>"#;
        let reduced = reduce(raw);
        assert!(reduced.contains("pagination"));
        assert!(reduced.contains("page-item"));
        assert!(!reduced.contains("Copyright"));
    }

    #[test]
    fn test_noise_selectors_removed() {
        let raw = r#"<div class="cookie-banner">We use cookies</div><div class="job-card">Intern</div><div id="footer">Foot</div>"#;
        let reduced = reduce(raw);
        assert!(!reduced.contains("cookies"));
        assert!(!reduced.contains("Foot"));
        assert!(reduced.contains("job-card"));
    }

    #[test]
    fn test_long_text_truncated_but_links_kept() {
        let long = "x".repeat(140);
        let raw = format!(r#"<div>{long}</div><div>{long}<a href="/apply">Apply</a></div>"#);
        let reduced = reduce(&raw);
        assert!(reduced.contains(&format!("{}... [TRUNCATED]", "x".repeat(100))));
        assert!(reduced.contains(&format!("{long}<a href=\"/apply\">Apply</a>")));
    }

    #[test]
    fn test_reduction_is_fixed_point() {
        let raw = r#"<div class="listing"><h2>Open roles</h2><ul><li><a href="/jobs/1">Software Intern</a></li><li><a href="/jobs/2">Data Intern</a></li></ul></div><header>Site</header>"#;
        let once = reduce(raw);
        let twice = reduce(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_snapshot_capture() {
        let url = Url::parse("https://acme.test/careers").unwrap();
        let raw = r#"<nav><a href="/home">Home</a></nav><main><a href="/jobs">Internships</a></main>"#.to_string();
        let snapshot = PageSnapshot::capture(url, raw);
        assert_eq!(snapshot.links.len(), 1);
        assert_eq!(snapshot.links[0].url, "https://acme.test/jobs");
        assert_eq!(snapshot.visible_text, "Internships");
        assert_eq!(snapshot.cache_key().len(), 64);
    }
}
