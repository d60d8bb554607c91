//! Controlled browser session.
//!
//! The engine drives pages exclusively through these traits so that
//! navigation, interaction and extraction can be exercised against an
//! in-memory browser in tests. The chromiumoxide implementation lives behind
//! the `render` feature.

#[cfg(feature = "render")]
pub mod chromium;

#[cfg(feature = "render")]
pub use chromium::{ChromiumLauncher, LaunchOptions};

use serde::Deserialize;
use thiserror::Error;

/// Errors raised by browser primitives.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Failed to launch or connect to the browser.
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    /// Navigation or a wait exceeded its budget.
    #[error("browser timeout after {0}ms")]
    Timeout(u64),

    /// Script evaluation threw or returned an unexpected value.
    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// Browser or page was already closed.
    #[error("browser closed")]
    Closed,

    /// Rendered mode is not compiled in.
    #[error("browser support disabled (build with the `render` feature)")]
    Disabled,
}

/// Observable state of a control such as a next-page link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ControlState {
    /// `disabled` attribute/property or `aria-disabled="true"`.
    pub disabled: bool,
    /// Not rendered (zero size or `display: none`).
    pub hidden: bool,
    /// Class list contains "disabled".
    pub disabled_class: bool,
}

impl ControlState {
    /// A control worth clicking: present, visible and enabled.
    pub fn is_actionable(&self) -> bool {
        !self.disabled && !self.hidden && !self.disabled_class
    }
}

/// One browser tab. History is genuine browser history.
#[async_trait::async_trait]
pub trait BrowserPage: Send + Sync {
    /// Navigate and wait for the load to complete.
    async fn goto(&self, url: &str) -> Result<(), BrowserError>;

    /// Current rendered markup.
    async fn content(&self) -> Result<String, BrowserError>;

    async fn current_url(&self) -> Result<String, BrowserError>;

    /// Replace the document with `markup`, keeping the current URL.
    async fn set_content(&self, markup: &str) -> Result<(), BrowserError>;

    /// Browser back-navigation.
    async fn go_back(&self) -> Result<(), BrowserError>;

    async fn fill(&self, selector: &str, value: &str) -> Result<(), BrowserError>;

    /// Press Enter in the element matched by `selector`.
    async fn press_enter(&self, selector: &str) -> Result<(), BrowserError>;

    /// Script-level click (`element.click()`), bypassing overlays.
    async fn click(&self, selector: &str) -> Result<(), BrowserError>;

    /// Number of elements matching `selector`.
    async fn count(&self, selector: &str) -> Result<usize, BrowserError>;

    /// State of the first element matching `selector`, `None` when absent.
    async fn control_state(&self, selector: &str) -> Result<Option<ControlState>, BrowserError>;

    /// Remove visible cookie/consent/privacy banners and fixed overlays.
    async fn dismiss_overlays(&self) -> Result<(), BrowserError>;

    async fn close(&self) -> Result<(), BrowserError>;
}

/// A running browser able to open pages.
#[async_trait::async_trait]
pub trait BrowserSession: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, BrowserError>;

    /// Tear down the browser process.
    async fn close(&self) -> Result<(), BrowserError>;
}

/// Factory for browser sessions, one per analysis or scrape run.
#[async_trait::async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// Launcher used when rendered mode is compiled out.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledLauncher;

#[async_trait::async_trait]
impl BrowserLauncher for DisabledLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        Err(BrowserError::Disabled)
    }
}

/// Selectors whose visible matches are removed by `dismiss_overlays`.
pub const OVERLAY_SELECTORS: &[&str] = &[
    r#"[class*="truste"]"#,
    r#"[id*="truste"]"#,
    r#"[class*="cookie"]"#,
    r#"[class*="privacy"]"#,
    r#"[class*="gdpr"]"#,
    r#"[class*="consent"]"#,
    r#"[style*="z-index: 999"]"#,
    r#"[style*="position: fixed"]"#,
];

/// Encode a value as a JavaScript string literal.
pub fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

pub(crate) mod scripts {
    use super::{OVERLAY_SELECTORS, js_string};

    /// Installed on every new document before page scripts run.
    pub const MASK_WEBDRIVER: &str = "Object.defineProperty(navigator, 'webdriver', { get: () => undefined });";

    pub fn click(selector: &str) -> String {
        format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return false; el.click(); return true; }})()",
            js_string(selector)
        )
    }

    pub fn fill(selector: &str, value: &str) -> String {
        format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return false; el.focus(); el.value = {}; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }})()",
            js_string(selector),
            js_string(value)
        )
    }

    pub fn press_enter(selector: &str) -> String {
        format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return false; \
             const opts = {{ key: 'Enter', code: 'Enter', keyCode: 13, which: 13, bubbles: true }}; \
             el.dispatchEvent(new KeyboardEvent('keydown', opts)); \
             el.dispatchEvent(new KeyboardEvent('keypress', opts)); \
             el.dispatchEvent(new KeyboardEvent('keyup', opts)); \
             if (el.form) {{ if (el.form.requestSubmit) {{ el.form.requestSubmit(); }} else {{ el.form.submit(); }} }} \
             return true; }})()",
            js_string(selector)
        )
    }

    pub fn count(selector: &str) -> String {
        format!("document.querySelectorAll({}).length", js_string(selector))
    }

    pub fn control_state(selector: &str) -> String {
        format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return null; \
             const style = window.getComputedStyle(el); \
             const hidden = style.display === 'none' || style.visibility === 'hidden' || \
               !(el.offsetWidth || el.offsetHeight || el.getClientRects().length); \
             return {{ \
               disabled: el.hasAttribute('disabled') || el.disabled === true || el.getAttribute('aria-disabled') === 'true', \
               hidden: hidden, \
               disabled_class: (el.getAttribute('class') || '').toLowerCase().includes('disabled') \
             }}; }})()",
            js_string(selector)
        )
    }

    pub fn set_content(markup: &str) -> String {
        format!("document.open(); document.write({}); document.close(); true", js_string(markup))
    }

    pub fn dismiss_overlays() -> String {
        let selectors = OVERLAY_SELECTORS.iter().map(|s| js_string(s)).collect::<Vec<_>>().join(", ");
        format!(
            "(() => {{ let removed = 0; [{selectors}].forEach(sel => document.querySelectorAll(sel).forEach(el => {{ \
             if (el.offsetHeight > 0 && el.offsetWidth > 0) {{ el.remove(); removed += 1; }} }})); return removed; }})()"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_string_escapes_quotes() {
        assert_eq!(js_string(r#"a[href="x"]"#), r#""a[href=\"x\"]""#);
        assert_eq!(js_string("it's"), r#""it's""#);
    }

    #[test]
    fn test_click_script_embeds_escaped_selector() {
        let script = scripts::click(r#"button[data-x="1"]"#);
        assert!(script.contains(r#"document.querySelector("button[data-x=\"1\"]")"#));
        assert!(script.contains("el.click()"));
    }

    #[test]
    fn test_overlay_script_lists_every_selector() {
        let script = scripts::dismiss_overlays();
        for selector in OVERLAY_SELECTORS {
            assert!(script.contains(&js_string(selector)));
        }
    }

    #[test]
    fn test_control_state_actionable() {
        assert!(ControlState::default().is_actionable());
        assert!(!ControlState { disabled: true, ..Default::default() }.is_actionable());
        assert!(!ControlState { hidden: true, ..Default::default() }.is_actionable());
        assert!(!ControlState { disabled_class: true, ..Default::default() }.is_actionable());
    }

    #[tokio::test]
    async fn test_disabled_launcher() {
        let result = DisabledLauncher.launch().await;
        assert!(matches!(result, Err(BrowserError::Disabled)));
    }
}
