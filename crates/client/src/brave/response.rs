use serde::{Deserialize, Serialize};

/// Subset of the Brave Web Search response that discovery reads.
#[derive(Debug, Deserialize)]
pub(crate) struct BraveApiResponse {
    #[serde(default)]
    pub web: Option<WebResults>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WebResults {
    #[serde(default)]
    pub results: Vec<WebResult>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WebResult {
    #[serde(default)]
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
}

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

impl BraveApiResponse {
    pub(crate) fn into_results(self) -> Vec<SearchResult> {
        self.web
            .map(|web| {
                web.results
                    .into_iter()
                    .map(|r| SearchResult { url: r.url, title: r.title, snippet: r.description })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_results_in_rank_order() {
        let raw: BraveApiResponse = serde_json::from_str(
            r#"{"query": {"original": "acme"}, "web": {"results": [
                {"title": "Acme Careers", "url": "https://acme.test/careers", "description": "Join us"},
                {"title": "Acme on a board", "url": "https://board.test/acme", "description": ""}
            ]}}"#,
        )
        .unwrap();

        let results = raw.into_results();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://acme.test/careers");
        assert_eq!(results[0].snippet, "Join us");
    }

    #[test]
    fn test_missing_web_section_is_empty() {
        let raw: BraveApiResponse = serde_json::from_str(r#"{"query": {"original": "acme"}}"#).unwrap();
        assert!(raw.into_results().is_empty());
    }
}
