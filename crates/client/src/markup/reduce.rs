//! Noise removal with pagination preservation.
//!
//! Works directly on the scraper DOM: nodes are detached from the tree rather
//! than re-serialized piecemeal, so ancestors of a kept pagination control stay
//! intact.

use ego_tree::{NodeId, Tree};
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

use super::ReduceError;

/// Tags removed unless their subtree carries a pagination signal.
pub const NOISE_TAGS: &[&str] = &[
    "script", "style", "meta", "link", "noscript", "header", "footer", "nav", "aside", "svg", "dialog", "template",
    "canvas", "audio", "video",
];

/// Class/id selectors for common chrome, consent, social, ad and comment regions.
pub const NOISE_SELECTORS: &[&str] = &[
    ".header",
    ".footer",
    ".navbar",
    ".menu",
    ".breadcrumb",
    ".breadcrumbs",
    ".sidebar",
    ".aside",
    "#header",
    "#footer",
    "#navbar",
    "#menu",
    ".cookie-banner",
    ".cookie-notice",
    ".privacy-notice",
    ".legal-notice",
    ".disclaimer",
    ".gdpr",
    ".consent",
    ".social-media",
    ".social-links",
    ".social-share",
    ".share-buttons",
    ".follow-us",
    ".social-icons",
    ".share",
    ".sharing",
    ".advertisement",
    ".ads",
    ".ad-banner",
    ".sponsored",
    ".promo",
    ".banner",
    ".popup",
    ".modal",
    ".comments",
    ".comment-section",
    ".reviews",
    ".testimonials",
    ".user-comments",
    ".feedback",
    ".newsletter-signup",
    ".subscribe-form",
    ".signup-form",
    ".back-to-top",
    ".scroll-to-top",
    ".skip-link",
];

/// Block elements whose lone text child is subject to truncation.
const TRUNCATE_TAGS: &[&str] = &["div", "p", "li", "section", "article", "td", "dd", "blockquote"];

const ATTRIBUTE_TOKENS: &[&str] =
    &["page", "next", "prev", "previous", "first", "last", "navigation", "nav-item", "nav-link"];

const TEXT_TOKENS: &[&str] = &["next", "prev", "previous", "first", "last"];

pub const TEXT_LIMIT: usize = 100;
pub const TRUNCATION_MARKER: &str = "... [TRUNCATED]";

pub(super) fn reduce_document(raw: &str) -> Result<String, ReduceError> {
    let mut html = Html::parse_document(raw);

    let comments: Vec<NodeId> = html.tree.nodes().filter(|n| n.value().is_comment()).map(|n| n.id()).collect();
    for id in comments {
        detach(&mut html.tree, id);
    }

    for tag in NOISE_TAGS {
        strip_matches(&mut html, tag)?;
    }
    for selector in NOISE_SELECTORS {
        strip_matches(&mut html, selector)?;
    }

    truncate_text_runs(&mut html.tree);

    Ok(strip_blank_lines(&html.html()))
}

fn strip_matches(html: &mut Html, selector: &str) -> Result<(), ReduceError> {
    let parsed = Selector::parse(selector)
        .map_err(|e| ReduceError::Selector { selector: selector.to_string(), reason: e.to_string() })?;
    let matched: Vec<NodeId> = html.select(&parsed).map(|el| el.id()).collect();

    for id in matched {
        if !is_attached(&html.tree, id) {
            continue;
        }
        let preserve = html.tree.get(id).and_then(ElementRef::wrap).is_some_and(preserves_pagination);
        if preserve {
            tracing::debug!(selector, "keeping noise node with pagination, cleaning its children");
            clean_non_pagination_children(&mut html.tree, id);
        } else {
            detach(&mut html.tree, id);
        }
    }
    Ok(())
}

/// Remove children that carry no pagination signal; recurse into the ones that do.
fn clean_non_pagination_children(tree: &mut Tree<Node>, id: NodeId) {
    let Some(node) = tree.get(id) else { return };

    let mut keep = Vec::new();
    let mut remove = Vec::new();
    for child in node.children() {
        let Some(element) = ElementRef::wrap(child) else { continue };
        if mentions_pagination(element) || is_pagination_relevant(element) {
            keep.push(child.id());
        } else {
            remove.push(child.id());
        }
    }

    for child in remove {
        detach(tree, child);
    }
    for child in keep {
        clean_non_pagination_children(tree, child);
    }
}

fn mentions_pagination(element: ElementRef<'_>) -> bool {
    element.html().to_lowercase().contains("pagination")
}

/// Preserve test for a whole noise node.
fn preserves_pagination(element: ElementRef<'_>) -> bool {
    mentions_pagination(element) || anchors(element).any(|a| a.value().attr("href").is_some_and(is_page_query_href))
}

/// Pagination-relevance test for a child of a preserved node.
pub(super) fn is_pagination_relevant(element: ElementRef<'_>) -> bool {
    let attrs = ["class", "role", "aria-label"]
        .iter()
        .filter_map(|name| element.value().attr(name))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    if ATTRIBUTE_TOKENS.iter().any(|token| attrs.contains(token)) {
        return true;
    }

    let text = element.text().collect::<String>();
    let trimmed = text.trim();
    if trimmed.chars().count() < 20 {
        let lower = trimmed.to_lowercase();
        if TEXT_TOKENS.iter().any(|token| lower.contains(token)) {
            return true;
        }
    }

    anchors(element).any(|anchor| {
        let href_signal = anchor
            .value()
            .attr("href")
            .is_some_and(|href| is_page_query_href(href) || matches!(href.trim(), "" | "#"));
        let link_text = anchor.text().collect::<String>();
        let link_text = link_text.trim();
        let numeric = !link_text.is_empty() && link_text.chars().all(|c| c.is_ascii_digit());
        href_signal || numeric
    })
}

pub(super) fn is_page_query_href(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    lower.contains("page=") || lower.contains("/page/")
}

/// The element itself (if an anchor) and every descendant anchor.
fn anchors(element: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    element
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "a")
}

fn truncate_text_runs(tree: &mut Tree<Node>) {
    let mut edits = Vec::new();
    for node in tree.root().descendants() {
        let Some(element) = ElementRef::wrap(node) else { continue };
        if !TRUNCATE_TAGS.contains(&element.value().name()) {
            continue;
        }

        let mut children = node.children();
        let (Some(only), None) = (children.next(), children.next()) else { continue };
        if let Node::Text(text) = only.value()
            && let Some(truncated) = truncate_text(text)
        {
            edits.push((only.id(), truncated));
        }
    }

    for (id, truncated) in edits {
        if let Some(mut node) = tree.get_mut(id)
            && let Node::Text(text) = node.value()
        {
            text.text = truncated.as_str().into();
        }
    }
}

/// Keep the first [`TEXT_LIMIT`] characters followed by the marker.
///
/// Text that already carries the marker is left alone so a second pass is a no-op.
pub(super) fn truncate_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.ends_with(TRUNCATION_MARKER) || trimmed.chars().count() <= TEXT_LIMIT {
        return None;
    }
    let head: String = trimmed.chars().take(TEXT_LIMIT).collect();
    Some(format!("{head}{TRUNCATION_MARKER}"))
}

fn strip_blank_lines(markup: &str) -> String {
    markup
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_attached(tree: &Tree<Node>, id: NodeId) -> bool {
    let root = tree.root().id();
    tree.get(id).is_some_and(|node| node.id() == root || node.ancestors().any(|a| a.id() == root))
}

fn detach(tree: &mut Tree<Node>, id: NodeId) {
    if let Some(mut node) = tree.get_mut(id) {
        node.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_element(markup: &str, selector: &str) -> bool {
        let html = Html::parse_fragment(markup);
        let selector = Selector::parse(selector).unwrap();
        html.select(&selector).next().map(is_pagination_relevant).unwrap()
    }

    #[test]
    fn test_relevance_by_attribute() {
        assert!(first_element(r#"<li class="page-item"><span>x</span></li>"#, "li"));
        assert!(first_element(r#"<div aria-label="Next results">x</div>"#, "div"));
        assert!(!first_element(r#"<div class="promo">Big sale today only</div>"#, "div"));
    }

    #[test]
    fn test_relevance_by_short_text() {
        assert!(first_element("<span>Next »</span>", "span"));
        assert!(!first_element("<span>Read the next chapter of our company story</span>", "span"));
    }

    #[test]
    fn test_relevance_by_anchor() {
        assert!(first_element(r#"<a href="/jobs?page=3">more</a>"#, "a"));
        assert!(first_element(r#"<div><a href="/x">7</a></div>"#, "div"));
        assert!(first_element(r##"<div><a href="#">more</a></div>"##, "div"));
        assert!(!first_element(r#"<div><a href="/about">About us</a></div>"#, "div"));
    }

    #[test]
    fn test_truncate_text_is_idempotent() {
        let long = "a".repeat(150);
        let once = truncate_text(&long).unwrap();
        assert_eq!(once.chars().count(), TEXT_LIMIT + TRUNCATION_MARKER.len());
        assert!(truncate_text(&once).is_none());
        assert!(truncate_text(&"b".repeat(100)).is_none());
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        let long = "é".repeat(120);
        let once = truncate_text(&long).unwrap();
        assert!(once.starts_with(&"é".repeat(100)));
    }

    #[test]
    fn test_page_query_href() {
        assert!(is_page_query_href("/page=2"));
        assert!(is_page_query_href("/jobs?Page=4"));
        assert!(is_page_query_href("/jobs/page/3"));
        assert!(!is_page_query_href("/pages-about"));
    }

    #[test]
    fn test_strip_blank_lines() {
        assert_eq!(strip_blank_lines("  <a>\n\n   \n  b  \n"), "<a>\nb");
    }
}
