//! In-memory collaborators for engine tests: a scripted model, a browser over
//! a fixed site map with genuine history, and a canned web search.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use scout_client::{
    BraveError, BrowserError, BrowserLauncher, BrowserPage, BrowserSession, ControlState, LanguageModel, LlmError,
    Prompt, SearchRequest, SearchResult, WebSearch,
};
use scraper::{Html, Selector};
use url::Url;

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(String),
}

struct Route {
    marker: String,
    replies: Mutex<VecDeque<Reply>>,
    calls: AtomicUsize,
}

/// Answers prompts by the first registered marker they contain. Each marker
/// has a reply queue; its last reply repeats forever.
#[derive(Default)]
pub struct ScriptedModel {
    routes: Vec<Route>,
    prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, marker: &str, text: &str) -> Self {
        self.push(marker, Reply::Text(text.to_string()))
    }

    pub fn fail(self, marker: &str, message: &str) -> Self {
        self.push(marker, Reply::Fail(message.to_string()))
    }

    fn push(mut self, marker: &str, reply: Reply) -> Self {
        match self.routes.iter().position(|r| r.marker == marker) {
            Some(idx) => self.routes[idx].replies.lock().unwrap().push_back(reply),
            None => self.routes.push(Route {
                marker: marker.to_string(),
                replies: Mutex::new(VecDeque::from([reply])),
                calls: AtomicUsize::new(0),
            }),
        }
        self
    }

    /// Number of prompts answered by `marker`'s route.
    pub fn calls(&self, marker: &str) -> usize {
        self.routes
            .iter()
            .find(|r| r.marker == marker)
            .map_or(0, |r| r.calls.load(Ordering::SeqCst))
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: Prompt) -> Result<String, LlmError> {
        let haystack = format!("{}\n{}", prompt.system.as_deref().unwrap_or_default(), prompt.user);
        self.prompts.lock().unwrap().push(prompt);

        let Some(route) = self.routes.iter().find(|r| haystack.contains(&r.marker)) else {
            let preview: String = haystack.trim().chars().take(80).collect();
            return Err(LlmError::Api { status: 404, message: format!("no scripted reply for: {preview}") });
        };
        route.calls.fetch_add(1, Ordering::SeqCst);

        let reply = {
            let mut replies = route.replies.lock().unwrap();
            if replies.len() > 1 { replies.pop_front() } else { replies.front().cloned() }
        };

        match reply {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(message)) => Err(LlmError::Network(message)),
            None => Err(LlmError::EmptyResponse),
        }
    }
}

/// Effect of clicking a control or pressing Enter in the fake browser.
#[derive(Debug, Clone)]
pub enum Action {
    /// Load another page from the site map, pushing history.
    Navigate(String),
    /// Replace the document in place; the URL stays the same.
    Replace(String),
}

#[derive(Default)]
struct SiteInner {
    pages: Mutex<HashMap<String, String>>,
    clicks: Mutex<HashMap<String, Action>>,
    enters: Mutex<HashMap<String, Action>>,
    visits: Mutex<Vec<String>>,
    fills: Mutex<Vec<(String, String)>>,
    launched: AtomicUsize,
    closed: AtomicUsize,
}

/// A fixed site map served by an in-memory browser.
#[derive(Clone, Default)]
pub struct FakeSite {
    inner: Arc<SiteInner>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, url: &str, markup: &str) -> Self {
        self.inner.pages.lock().unwrap().insert(url.to_string(), markup.to_string());
        self
    }

    pub fn on_click(self, selector: &str, action: Action) -> Self {
        self.inner.clicks.lock().unwrap().insert(selector.to_string(), action);
        self
    }

    pub fn on_enter(self, selector: &str, action: Action) -> Self {
        self.inner.enters.lock().unwrap().insert(selector.to_string(), action);
        self
    }

    pub fn launcher(&self) -> FakeLauncher {
        FakeLauncher { site: self.clone() }
    }

    /// Every URL loaded by any page, in order.
    pub fn visits(&self) -> Vec<String> {
        self.inner.visits.lock().unwrap().clone()
    }

    pub fn fills(&self) -> Vec<(String, String)> {
        self.inner.fills.lock().unwrap().clone()
    }

    pub fn launched_sessions(&self) -> usize {
        self.inner.launched.load(Ordering::SeqCst)
    }

    pub fn closed_sessions(&self) -> usize {
        self.inner.closed.load(Ordering::SeqCst)
    }

    fn lookup(&self, url: &str) -> Option<String> {
        let pages = self.inner.pages.lock().unwrap();
        pages
            .get(url)
            .or_else(|| pages.get(url.trim_end_matches('/')))
            .or_else(|| pages.get(&format!("{url}/")))
            .cloned()
    }
}

pub struct FakeLauncher {
    site: FakeSite,
}

#[async_trait::async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        self.site.inner.launched.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession { site: self.site.clone() }))
    }
}

struct FakeSession {
    site: FakeSite,
}

#[async_trait::async_trait]
impl BrowserSession for FakeSession {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, BrowserError> {
        Ok(Box::new(FakePage {
            site: self.site.clone(),
            state: Mutex::new(PageState { url: "about:blank".into(), markup: String::new(), history: Vec::new() }),
        }))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.site.inner.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct PageState {
    url: String,
    markup: String,
    history: Vec<(String, String)>,
}

struct FakePage {
    site: FakeSite,
    state: Mutex<PageState>,
}

impl FakePage {
    fn load(&self, url: &str) -> Result<(), BrowserError> {
        let markup = self
            .site
            .lookup(url)
            .ok_or_else(|| BrowserError::Navigation(format!("net::ERR_NAME_NOT_RESOLVED at {url}")))?;
        self.site.inner.visits.lock().unwrap().push(url.to_string());

        let mut state = self.state.lock().unwrap();
        if state.url != "about:blank" {
            let previous = (state.url.clone(), state.markup.clone());
            state.history.push(previous);
        }
        state.url = url.to_string();
        state.markup = markup;
        Ok(())
    }

    fn apply(&self, action: &Action) -> Result<(), BrowserError> {
        match action {
            Action::Navigate(url) => self.load(url),
            Action::Replace(markup) => {
                self.state.lock().unwrap().markup = markup.clone();
                Ok(())
            }
        }
    }

    fn with_first<T>(&self, selector: &str, f: impl FnOnce(scraper::ElementRef<'_>) -> T) -> Result<Option<T>, BrowserError> {
        let parsed = Selector::parse(selector).map_err(|e| BrowserError::Script(format!("SyntaxError: {e:?}")))?;
        let markup = self.state.lock().unwrap().markup.clone();
        let document = Html::parse_document(&markup);
        Ok(document.select(&parsed).next().map(f))
    }

    fn require(&self, selector: &str) -> Result<(), BrowserError> {
        match self.with_first(selector, |_| ())? {
            Some(()) => Ok(()),
            None => Err(BrowserError::ElementNotFound(selector.to_string())),
        }
    }
}

#[async_trait::async_trait]
impl BrowserPage for FakePage {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.load(url)
    }

    async fn content(&self) -> Result<String, BrowserError> {
        Ok(self.state.lock().unwrap().markup.clone())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn set_content(&self, markup: &str) -> Result<(), BrowserError> {
        self.state.lock().unwrap().markup = markup.to_string();
        Ok(())
    }

    async fn go_back(&self) -> Result<(), BrowserError> {
        let mut state = self.state.lock().unwrap();
        let (url, markup) = state.history.pop().ok_or_else(|| BrowserError::Navigation("no history".into()))?;
        state.url = url;
        state.markup = markup;
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), BrowserError> {
        self.require(selector)?;
        self.site.inner.fills.lock().unwrap().push((selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn press_enter(&self, selector: &str) -> Result<(), BrowserError> {
        self.require(selector)?;
        let action = self.site.inner.enters.lock().unwrap().get(selector).cloned();
        match action {
            Some(action) => self.apply(&action),
            None => Ok(()),
        }
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        let href = self
            .with_first(selector, |el| el.value().attr("href").map(str::to_string))?
            .ok_or_else(|| BrowserError::ElementNotFound(selector.to_string()))?;

        let action = self.site.inner.clicks.lock().unwrap().get(selector).cloned();
        if let Some(action) = action {
            return self.apply(&action);
        }

        let Some(href) = href else { return Ok(()) };
        let current = self.state.lock().unwrap().url.clone();
        let target = Url::parse(&current)
            .and_then(|base| base.join(&href))
            .map_err(|e| BrowserError::Navigation(e.to_string()))?;
        self.load(target.as_str())
    }

    async fn count(&self, selector: &str) -> Result<usize, BrowserError> {
        let parsed = Selector::parse(selector).map_err(|e| BrowserError::Script(format!("SyntaxError: {e:?}")))?;
        let markup = self.state.lock().unwrap().markup.clone();
        Ok(Html::parse_document(&markup).select(&parsed).count())
    }

    async fn control_state(&self, selector: &str) -> Result<Option<ControlState>, BrowserError> {
        self.with_first(selector, |el| {
            let attrs = el.value();
            ControlState {
                disabled: attrs.attr("disabled").is_some() || attrs.attr("aria-disabled") == Some("true"),
                hidden: attrs.attr("hidden").is_some()
                    || attrs.attr("style").is_some_and(|s| s.replace(' ', "").contains("display:none")),
                disabled_class: attrs.attr("class").is_some_and(|c| c.to_lowercase().contains("disabled")),
            }
        })
    }

    async fn dismiss_overlays(&self) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), BrowserError> {
        Ok(())
    }
}

/// Web search returning canned results for queries containing a key.
#[derive(Default)]
pub struct FakeSearch {
    results: Vec<(String, Vec<SearchResult>)>,
    queries: Mutex<Vec<String>>,
}

impl FakeSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(mut self, query_contains: &str, urls: &[&str]) -> Self {
        let results = urls
            .iter()
            .map(|url| SearchResult { url: url.to_string(), title: format!("Result {url}"), snippet: String::new() })
            .collect();
        self.results.push((query_contains.to_string(), results));
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl WebSearch for FakeSearch {
    async fn search(&self, request: SearchRequest) -> Result<Vec<SearchResult>, BraveError> {
        request.validate()?;
        self.queries.lock().unwrap().push(request.q.clone());
        Ok(self
            .results
            .iter()
            .find(|(key, _)| request.q.contains(key.as_str()))
            .map(|(_, results)| results.clone())
            .unwrap_or_default())
    }
}
