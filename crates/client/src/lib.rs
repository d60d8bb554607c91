//! Client code for intern-scout.
//!
//! This crate provides the collaborators the analysis engine drives: markup
//! reduction, the controlled browser session, the generative model client and
//! Brave web search.

pub mod brave;
pub mod browser;
pub mod llm;
pub mod markup;
pub mod urls;

pub use brave::{BraveClient, BraveConfig, BraveError, SearchRequest, SearchResult, WebSearch};
pub use browser::{BrowserError, BrowserLauncher, BrowserPage, BrowserSession, ControlState, DisabledLauncher};
#[cfg(feature = "render")]
pub use browser::{ChromiumLauncher, LaunchOptions};
pub use llm::{ChatClient, LanguageModel, LlmError, Prompt, ResponseFormat, StructuredOutput};
pub use markup::{Link, PageSnapshot, PageText, extract_text_and_links, reduce};
pub use urls::{UrlError, canonicalize};
