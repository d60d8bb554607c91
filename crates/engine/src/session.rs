//! Scoped browser ownership for one analysis or scrape run.
//!
//! [`AnalysisSession`] owns the browser process. Callers finish with
//! [`AnalysisSession::close`]; if a run is cancelled or panics first, the
//! `Drop` impl schedules the teardown on the current runtime instead.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use scout_client::markup::PageSnapshot;
use scout_client::{BrowserError, BrowserLauncher, BrowserPage, BrowserSession};
use tokio::sync::Mutex;
use url::Url;

/// A launched browser, closed exactly once.
pub struct AnalysisSession {
    browser: Option<Box<dyn BrowserSession>>,
    settle: Duration,
}

impl AnalysisSession {
    /// # Errors
    ///
    /// Returns the launcher's `BrowserError` when the browser cannot start.
    pub async fn launch(launcher: &dyn BrowserLauncher, settle: Duration) -> Result<Self, BrowserError> {
        let browser = launcher.launch().await?;
        Ok(Self { browser: Some(browser), settle })
    }

    /// Open a fresh tab sharing this browser.
    pub async fn open_page(&self) -> Result<SessionPage, BrowserError> {
        let browser = self.browser.as_ref().ok_or(BrowserError::Closed)?;
        let page = browser.new_page().await?;
        Ok(SessionPage { page, settle: self.settle, cache: Mutex::new(HashMap::new()) })
    }

    /// Tear the browser down. Failures are logged, never returned, so they
    /// cannot mask the outcome of the run.
    pub async fn close(mut self) {
        if let Some(browser) = self.browser.take()
            && let Err(e) = browser.close().await
        {
            tracing::warn!(error = %e, "browser teardown failed");
        }
    }
}

impl Drop for AnalysisSession {
    fn drop(&mut self) {
        let Some(browser) = self.browser.take() else { return };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!("browser session dropped without close, scheduling teardown");
                handle.spawn(async move {
                    if let Err(e) = browser.close().await {
                        tracing::warn!(error = %e, "deferred browser teardown failed");
                    }
                });
            }
            Err(_) => tracing::warn!("browser session dropped outside a runtime; process may leak"),
        }
    }
}

/// One tab plus its per-session snapshot cache.
///
/// Snapshots are keyed by URL and raw markup length. The cache is cleared on
/// every navigation, back-navigation and interaction, so a reused snapshot
/// always belongs to the current document.
pub struct SessionPage {
    page: Box<dyn BrowserPage>,
    settle: Duration,
    cache: Mutex<HashMap<String, Arc<PageSnapshot>>>,
}

impl SessionPage {
    pub fn page(&self) -> &dyn BrowserPage {
        self.page.as_ref()
    }

    /// Navigate, then wait out the settle delay.
    pub async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        tracing::debug!(url, "navigating");
        let result = self.page.goto(url).await;
        self.invalidate().await;
        result?;
        self.settle().await;
        Ok(())
    }

    /// Browser back-navigation, then settle.
    pub async fn go_back(&self) -> Result<(), BrowserError> {
        let result = self.page.go_back().await;
        self.invalidate().await;
        result?;
        self.settle().await;
        Ok(())
    }

    /// Drop cached snapshots after the document changed.
    pub async fn invalidate(&self) {
        self.cache.lock().await.clear();
    }

    /// Delay letting client-side rendering finish after load or interaction.
    pub async fn settle(&self) {
        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }
    }

    pub async fn current_url(&self) -> Result<Url, BrowserError> {
        let raw = self.page.current_url().await?;
        Url::parse(&raw).map_err(|e| BrowserError::Navigation(format!("page reported invalid url {raw:?}: {e}")))
    }

    /// Snapshot of the page as currently rendered, reusing a cached
    /// reduction when neither URL nor markup length changed.
    pub async fn snapshot(&self) -> Result<Arc<PageSnapshot>, BrowserError> {
        let url = self.current_url().await?;
        let raw = self.page.content().await?;
        let key = scout_core::hash::snapshot_key(url.as_str(), raw.len());

        let mut cache = self.cache.lock().await;
        if let Some(hit) = cache.get(&key) {
            tracing::debug!(url = %url, "snapshot cache hit");
            return Ok(Arc::clone(hit));
        }

        let snapshot = Arc::new(PageSnapshot::capture(url, raw));
        cache.insert(key, Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Close the tab, logging failures.
    pub async fn close(self) {
        if let Err(e) = self.page.close().await {
            tracing::debug!(error = %e, "page close failed");
        }
    }
}
