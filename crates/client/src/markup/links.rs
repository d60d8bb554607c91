//! Visible text and outbound link harvesting from reduced markup.

use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use url::Url;

use crate::urls::resolve_href;

/// A navigable link with its display text and absolute target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub text: String,
    pub url: String,
}

/// Plain-text rendering and outbound links of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageText {
    pub visible_text: String,
    pub links: Vec<Link>,
}

/// Collapse every run of whitespace to a single space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Derive visible text and navigable links from (reduced) markup.
///
/// Anchors need non-empty text. Iframe sources count as links, labelled by
/// their `title`, `name` or `id` attribute, else `"iframe"`. Targets are
/// resolved against `base_url` and deduplicated, first occurrence winning.
pub fn extract_text_and_links(markup: &str, base_url: &Url) -> PageText {
    let document = Html::parse_document(markup);

    let visible_text = collapse_whitespace(&document.root_element().text().collect::<Vec<_>>().join(" "));

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.root_element().descendants().filter_map(ElementRef::wrap) {
        let candidate = match element.value().name() {
            "a" => element.value().attr("href").and_then(|href| {
                let text = collapse_whitespace(&element.text().collect::<String>());
                (!text.is_empty()).then_some((text, href))
            }),
            "iframe" => element.value().attr("src").map(|src| {
                let label = ["title", "name", "id"]
                    .iter()
                    .filter_map(|attr| element.value().attr(attr))
                    .map(str::trim)
                    .find(|value| !value.is_empty())
                    .unwrap_or("iframe");
                (label.to_string(), src)
            }),
            _ => None,
        };

        let Some((text, target)) = candidate else { continue };
        let Some(url) = resolve_href(base_url, target) else { continue };

        if seen.insert(url.clone()) {
            links.push(Link { text, url });
        }
    }

    PageText { visible_text, links }
}
