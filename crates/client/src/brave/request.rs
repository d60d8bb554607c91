use serde::Serialize;

use super::BraveError;

/// Safe search filtering levels.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SafeSearch {
    Off,
    #[default]
    Moderate,
    Strict,
}

/// Query parameters for `GET /web/search`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SearchRequest {
    /// Max 400 chars / 50 words.
    pub q: String,
    /// 1-20.
    pub count: u8,
    /// 0-9.
    pub offset: u8,
    pub safesearch: SafeSearch,
}

impl SearchRequest {
    /// Ten results, first page, moderate safe-search.
    pub fn new(q: impl Into<String>) -> Self {
        Self { q: q.into(), count: 10, offset: 0, safesearch: SafeSearch::Moderate }
    }

    /// # Errors
    ///
    /// Returns the `BraveError` variant naming the first out-of-range parameter.
    pub fn validate(&self) -> Result<(), BraveError> {
        let q = self.q.trim();
        if q.is_empty() {
            return Err(BraveError::InvalidQuery("query cannot be empty".into()));
        }

        let chars = q.chars().count();
        if chars > 400 {
            return Err(BraveError::InvalidQuery(format!("query too long: {chars} chars (max 400)")));
        }

        let words = q.split_whitespace().count();
        if words > 50 {
            return Err(BraveError::InvalidQuery(format!("query too long: {words} words (max 50)")));
        }

        if !(1..=20).contains(&self.count) {
            return Err(BraveError::InvalidCount);
        }

        if self.offset > 9 {
            return Err(BraveError::InvalidOffset);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_request_is_valid() {
        let req = SearchRequest::new("Acme student summer internship");
        assert_eq!(req.count, 10);
        assert_eq!(req.safesearch, SafeSearch::Moderate);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_blank_query_rejected() {
        assert!(matches!(SearchRequest::new("   ").validate(), Err(BraveError::InvalidQuery(_))));
    }

    #[test]
    fn test_query_limits() {
        assert!(SearchRequest::new("a".repeat(401)).validate().is_err());
        assert!(SearchRequest::new("a".repeat(400)).validate().is_ok());
        assert!(SearchRequest::new(vec!["w"; 51].join(" ")).validate().is_err());
    }

    #[test]
    fn test_count_and_offset_bounds() {
        let req = SearchRequest { count: 21, ..SearchRequest::new("acme") };
        assert!(matches!(req.validate(), Err(BraveError::InvalidCount)));

        let req = SearchRequest { count: 0, ..SearchRequest::new("acme") };
        assert!(matches!(req.validate(), Err(BraveError::InvalidCount)));

        let req = SearchRequest { offset: 10, ..SearchRequest::new("acme") };
        assert!(matches!(req.validate(), Err(BraveError::InvalidOffset)));
    }

    #[test]
    fn test_query_serialization() {
        let value = serde_json::to_value(SearchRequest::new("acme jobs")).unwrap();
        assert_eq!(value["q"], "acme jobs");
        assert_eq!(value["safesearch"], "moderate");
    }
}
