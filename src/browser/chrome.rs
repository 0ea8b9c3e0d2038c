use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::{html, BrowserPage, BrowserSession, PageElement};
use crate::config::ScraperConfig;
use crate::utils::error::{AppError, Result};

/// Headless Chrome session, launched lazily on the first page request and
/// reused by every page until [`BrowserSession::close`].
pub struct ChromeSession {
    config: ScraperConfig,
    browser: Mutex<Option<Arc<Browser>>>,
}

pub struct ChromePage {
    tab: Arc<Tab>,
}

impl ChromeSession {
    pub fn new(config: ScraperConfig) -> Self {
        Self {
            config,
            browser: Mutex::new(None),
        }
    }

    fn launch(config: &ScraperConfig) -> anyhow::Result<Browser> {
        let mut launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(false) // Often needed in containerized environments
            .idle_browser_timeout(Duration::from_secs(600))
            .args(vec![
                std::ffi::OsStr::new("--no-sandbox"),
                std::ffi::OsStr::new("--disable-dev-shm-usage"),
                std::ffi::OsStr::new("--disable-gpu"),
                std::ffi::OsStr::new("--disable-extensions"),
                std::ffi::OsStr::new("--disable-background-timer-throttling"),
                std::ffi::OsStr::new("--disable-renderer-backgrounding"),
            ])
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create launch options: {}", e))?;

        // Set Chrome path if provided
        if let Some(chrome_path) = &config.chrome_path {
            launch_options.path = Some(std::path::PathBuf::from(chrome_path));
        }

        Browser::new(launch_options)
    }

    async fn ensure_browser(&self) -> Result<Arc<Browser>> {
        let mut guard = self.browser.lock().await;
        if let Some(browser) = guard.as_ref() {
            return Ok(Arc::clone(browser));
        }

        let config = self.config.clone();
        let browser = tokio::task::spawn_blocking(move || Self::launch(&config))
            .await
            .map_err(|e| AppError::Browser(format!("Browser launch task failed: {}", e)))?
            .map_err(|e| AppError::Browser(format!("Failed to launch browser: {}", e)))?;

        tracing::info!("Launched headless browser");
        let browser = Arc::new(browser);
        *guard = Some(Arc::clone(&browser));
        Ok(browser)
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>> {
        let browser = self.ensure_browser().await?;
        let user_agent = self.config.user_agent.clone();
        let timeout = Duration::from_secs(self.config.navigation_timeout_secs);

        let tab = tokio::task::spawn_blocking(move || -> anyhow::Result<Arc<Tab>> {
            let tab = browser.new_tab()?;
            tab.set_default_timeout(timeout);
            tab.set_user_agent(&user_agent, None, None)?;
            Ok(tab)
        })
        .await
        .map_err(|e| AppError::Browser(format!("Tab task failed: {}", e)))?
        .map_err(|e| AppError::Browser(format!("Failed to create tab: {}", e)))?;

        Ok(Box::new(ChromePage { tab }))
    }

    async fn close(&self) -> Result<()> {
        let browser = self.browser.lock().await.take();
        if let Some(browser) = browser {
            // Dropping the last handle kills the Chrome process.
            tokio::task::spawn_blocking(move || drop(browser))
                .await
                .map_err(|e| AppError::Browser(format!("Browser shutdown failed: {}", e)))?;
            tracing::info!("Closed headless browser");
        }
        Ok(())
    }
}

impl ChromePage {
    async fn blocking<T, F>(&self, f: F) -> Result<anyhow::Result<T>>
    where
        F: FnOnce(&Tab) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || f(&tab))
            .await
            .map_err(|e| AppError::Browser(format!("Browser task failed: {}", e)))
    }

    /// Waits for a navigation started by an interaction on the current page.
    async fn await_navigation(&self) -> Result<()> {
        self.blocking(|tab| tab.wait_until_navigated().map(|_| ()))
            .await?
            .map_err(|e| navigation_error(&self.current_url(), e))
    }

    async fn content(&self) -> Result<String> {
        self.blocking(|tab| tab.get_content())
            .await?
            .map_err(|e| AppError::Browser(format!("Failed to get page content: {}", e)))
    }
}

#[async_trait]
impl BrowserPage for ChromePage {
    async fn open(&self, url: &str) -> Result<()> {
        let target = url.to_string();
        self.blocking(move |tab| {
            tab.navigate_to(&target)?.wait_until_navigated()?;
            Ok(())
        })
        .await?
        .map_err(|e| navigation_error(url, e))
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<PageElement>> {
        let content = self.content().await?;
        html::select_all(&content, selector, Some(&self.current_url()))
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let target = selector.to_string();
        self.blocking(move |tab| {
            tab.find_element(&target)?.click()?;
            Ok(())
        })
        .await?
        .map_err(|_| AppError::ElementNotFound {
            selector: selector.to_string(),
        })?;
        self.await_navigation().await
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        let target = selector.to_string();
        let text = text.to_string();
        self.blocking(move |tab| {
            let element = tab.find_element(&target)?;
            element.click()?;
            element.type_into(&text)?;
            Ok(())
        })
        .await?
        .map_err(|_| AppError::ElementNotFound {
            selector: selector.to_string(),
        })
    }

    async fn press_enter(&self, selector: &str) -> Result<()> {
        let target = selector.to_string();
        self.blocking(move |tab| {
            tab.find_element(&target)?.focus()?;
            tab.press_key("Enter")?;
            Ok(())
        })
        .await?
        .map_err(|_| AppError::ElementNotFound {
            selector: selector.to_string(),
        })?;
        self.await_navigation().await
    }

    fn current_url(&self) -> String {
        self.tab.get_url()
    }

    async fn close(&self) -> Result<()> {
        self.blocking(|tab| tab.close(true).map(|_| ()))
            .await?
            .map_err(|e| AppError::Browser(format!("Failed to close tab: {}", e)))
    }
}

fn navigation_error(url: &str, err: anyhow::Error) -> AppError {
    AppError::Navigation {
        url: url.to_string(),
        message: err.to_string(),
    }
}
