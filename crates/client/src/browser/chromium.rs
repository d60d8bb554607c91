//! Headless Chrome/Chromium session using chromiumoxide.

use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::page::Page;
use futures_util::StreamExt;
use scout_core::ScoutConfig;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::{BrowserError, BrowserLauncher, BrowserPage, BrowserSession, ControlState, scripts};

/// Launch settings for the controlled browser.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub user_agent: String,
    pub viewport: (u32, u32),
    pub navigation_timeout: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self::from(&ScoutConfig::default())
    }
}

impl From<&ScoutConfig> for LaunchOptions {
    fn from(config: &ScoutConfig) -> Self {
        Self {
            headless: config.headless,
            user_agent: config.user_agent.clone(),
            viewport: (1920, 1080),
            navigation_timeout: config.navigation_timeout(),
        }
    }
}

/// Launches one chromiumoxide browser per session.
#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher {
    options: LaunchOptions,
}

impl ChromiumLauncher {
    pub fn new(options: LaunchOptions) -> Self {
        Self { options }
    }
}

#[async_trait::async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let (width, height) = self.options.viewport;
        let mut builder = BrowserConfig::builder()
            .window_size(width, height)
            .arg("--disable-blink-features=AutomationControlled")
            .arg(format!("--user-agent={}", self.options.user_agent));
        if !self.options.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("browser handler event error: {e}");
                    break;
                }
            }
        });

        tracing::info!(headless = self.options.headless, "launched browser session");

        Ok(Box::new(ChromiumSession {
            browser: Mutex::new(Some(browser)),
            handler,
            navigation_timeout: self.options.navigation_timeout,
        }))
    }
}

/// A running browser process and its CDP event pump.
pub struct ChromiumSession {
    browser: Mutex<Option<Browser>>,
    handler: JoinHandle<()>,
    navigation_timeout: Duration,
}

#[async_trait::async_trait]
impl BrowserSession for ChromiumSession {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, BrowserError> {
        let guard = self.browser.lock().await;
        let browser = guard.as_ref().ok_or(BrowserError::Closed)?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        page.evaluate_on_new_document(AddScriptToEvaluateOnNewDocumentParams::new(scripts::MASK_WEBDRIVER))
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;

        Ok(Box::new(ChromiumPage { page, navigation_timeout: self.navigation_timeout }))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        let Some(mut browser) = self.browser.lock().await.take() else {
            return Ok(());
        };

        let result = browser.close().await.map(|_| ()).map_err(|e| BrowserError::Launch(e.to_string()));
        if let Err(e) = browser.wait().await {
            tracing::debug!("browser process wait failed: {e}");
        }
        self.handler.abort();

        tracing::info!("closed browser session");
        result
    }
}

/// One chromiumoxide tab.
pub struct ChromiumPage {
    page: Page,
    navigation_timeout: Duration,
}

impl ChromiumPage {
    async fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T, BrowserError> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?
            .into_value()
            .map_err(|e| BrowserError::Script(format!("{e:?}")))
    }

    async fn eval_found(&self, script: String, selector: &str) -> Result<(), BrowserError> {
        if self.eval::<bool>(script).await? { Ok(()) } else { Err(BrowserError::ElementNotFound(selector.to_string())) }
    }
}

#[async_trait::async_trait]
impl BrowserPage for ChromiumPage {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        let timeout_ms = self.navigation_timeout.as_millis() as u64;
        tokio::time::timeout(self.navigation_timeout, async {
            self.page
                .goto(url)
                .await
                .map_err(|e| BrowserError::Navigation(e.to_string()))?;
            self.page
                .wait_for_navigation()
                .await
                .map_err(|e| BrowserError::Navigation(e.to_string()))?;
            Ok::<(), BrowserError>(())
        })
        .await
        .map_err(|_| BrowserError::Timeout(timeout_ms))?
    }

    async fn content(&self) -> Result<String, BrowserError> {
        self.page
            .content()
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        Ok(url.unwrap_or_default())
    }

    async fn set_content(&self, markup: &str) -> Result<(), BrowserError> {
        self.eval::<bool>(scripts::set_content(markup)).await.map(|_| ())
    }

    async fn go_back(&self) -> Result<(), BrowserError> {
        let timeout_ms = self.navigation_timeout.as_millis() as u64;
        self.eval::<serde_json::Value>("history.back(); true".to_string()).await?;
        tokio::time::timeout(self.navigation_timeout, self.page.wait_for_navigation())
            .await
            .map_err(|_| BrowserError::Timeout(timeout_ms))?
            .map_err(|e| BrowserError::Navigation(e.to_string()))?;
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), BrowserError> {
        self.eval_found(scripts::fill(selector, value), selector).await
    }

    async fn press_enter(&self, selector: &str) -> Result<(), BrowserError> {
        self.eval_found(scripts::press_enter(selector), selector).await
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        self.eval_found(scripts::click(selector), selector).await
    }

    async fn count(&self, selector: &str) -> Result<usize, BrowserError> {
        self.eval(scripts::count(selector)).await
    }

    async fn control_state(&self, selector: &str) -> Result<Option<ControlState>, BrowserError> {
        self.eval(scripts::control_state(selector)).await
    }

    async fn dismiss_overlays(&self) -> Result<(), BrowserError> {
        let removed: u64 = self.eval(scripts::dismiss_overlays()).await?;
        tracing::debug!(removed, "dismissed overlay elements");
        Ok(())
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_options_from_config() {
        let config = ScoutConfig { headless: false, user_agent: "scout-test".into(), ..Default::default() };
        let options = LaunchOptions::from(&config);
        assert!(!options.headless);
        assert_eq!(options.user_agent, "scout-test");
        assert_eq!(options.viewport, (1920, 1080));
        assert_eq!(options.navigation_timeout, Duration::from_secs(60));
    }

    #[tokio::test]
    #[ignore = "requires Chrome/Chromium installation"]
    async fn test_chromium_session_roundtrip() {
        let session = ChromiumLauncher::default().launch().await.unwrap();
        let page = session.new_page().await.unwrap();

        page.set_content(r#"<ul><li class="job"><a href="/jobs/1">Intern</a></li></ul><button id="next">Next</button>"#)
            .await
            .unwrap();
        assert_eq!(page.count("li.job").await.unwrap(), 1);
        assert!(page.control_state("#next").await.unwrap().unwrap().is_actionable());
        assert!(page.control_state("#missing").await.unwrap().is_none());
        assert!(matches!(page.click("#missing").await, Err(BrowserError::ElementNotFound(_))));

        page.close().await.unwrap();
        session.close().await.unwrap();
    }
}
