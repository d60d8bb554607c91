//! Seed URL canonicalization and href resolution.

use url::Url;

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize a seed URL.
///
/// Trims whitespace, defaults the scheme to `https`, lowercases the host and
/// drops the fragment. The query string is kept as-is.
pub fn canonicalize(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") || explicit_scheme(trimmed).is_some() {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let mut parsed = Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str().map(str::to_lowercase) {
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Scheme of a `scheme:rest` input with no `//`, such as `mailto:` or `tel:`.
///
/// `host:port` forms (`localhost:8080/jobs`) are not schemes.
fn explicit_scheme(input: &str) -> Option<&str> {
    let (scheme, rest) = input.split_once(':')?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid {
        return None;
    }

    let port_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let is_port = port_end > 0 && rest[..port_end].chars().all(|c| c.is_ascii_digit());
    (!is_port).then_some(scheme)
}

/// Whether an href points somewhere a browser could navigate to.
///
/// Script, mail and phone targets and same-page `#` anchors are not navigable.
pub fn is_navigable_href(href: &str) -> bool {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return false;
    }
    let lower = href.to_ascii_lowercase();
    !["javascript:", "mailto:", "tel:"].iter().any(|scheme| lower.starts_with(scheme))
}

/// Resolve a navigable href against `base`, returning an absolute URL string.
pub fn resolve_href(base: &Url, href: &str) -> Option<String> {
    if !is_navigable_href(href) {
        return None;
    }
    base.join(href.trim()).ok().map(String::from)
}
