//! Narrow browser capability interface used by the scraper.
//!
//! Orchestration code only talks to [`BrowserSession`] and [`BrowserPage`],
//! so it runs the same against headless Chrome and against an in-memory site.

pub mod chrome;
pub mod html;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::ScraperConfig;
use crate::utils::error::Result;

pub use chrome::ChromeSession;

/// Snapshot of a DOM element taken from a live page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageElement {
    pub text: String,
    pub href: Option<String>,
    pub src: Option<String>,
}

/// One browser tab. Owned by a single task for its lifetime; the owner must
/// call [`BrowserPage::close`] on every exit path.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Navigate and wait for the page to settle.
    async fn open(&self, url: &str) -> Result<()>;

    async fn find_all(&self, selector: &str) -> Result<Vec<PageElement>>;

    async fn find_first(&self, selector: &str) -> Result<Option<PageElement>> {
        Ok(self.find_all(selector).await?.into_iter().next())
    }

    /// Text of the first match, `None` when nothing matches or the text is blank.
    async fn extract_text(&self, selector: &str) -> Result<Option<String>> {
        Ok(self
            .find_first(selector)
            .await?
            .map(|e| e.text)
            .filter(|t| !t.trim().is_empty()))
    }

    async fn click(&self, selector: &str) -> Result<()>;

    async fn type_text(&self, selector: &str, text: &str) -> Result<()>;

    /// Presses Enter inside `selector` and waits for the resulting navigation.
    /// Used for search boxes that have no submit button.
    async fn press_enter(&self, selector: &str) -> Result<()>;

    fn current_url(&self) -> String;

    async fn close(&self) -> Result<()>;
}

/// A browser shared by every task in a job. Pages are opened per task.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>>;

    /// Releases the underlying browser. Safe to call more than once.
    async fn close(&self) -> Result<()>;
}

/// Opens a fresh [`BrowserSession`] for each enrichment job.
pub trait SessionFactory: Send + Sync {
    fn create(&self) -> Arc<dyn BrowserSession>;
}

impl<F> SessionFactory for F
where
    F: Fn() -> Arc<dyn BrowserSession> + Send + Sync,
{
    fn create(&self) -> Arc<dyn BrowserSession> {
        self()
    }
}

/// Launches headless Chrome with the configured options.
#[derive(Debug, Clone)]
pub struct ChromeSessionFactory {
    config: ScraperConfig,
}

impl ChromeSessionFactory {
    pub fn new(config: ScraperConfig) -> Self {
        Self { config }
    }
}

impl SessionFactory for ChromeSessionFactory {
    fn create(&self) -> Arc<dyn BrowserSession> {
        Arc::new(ChromeSession::new(self.config.clone()))
    }
}
