//! Ordered ways of finding a product's detail page on a manufacturer site.
//!
//! Each strategy returns the detail URL of the first matching candidate, or
//! `None` to hand over to the next one.

use async_trait::async_trait;

use crate::browser::{BrowserPage, PageElement};
use crate::models::RawProductRow;
use crate::registry::ManufacturerProfile;
use crate::retry::Retrier;
use crate::utils::error::{AppError, Result};

/// Everything a strategy needs for one row. The page belongs to the calling task.
pub struct ScrapeContext<'a> {
    pub page: &'a dyn BrowserPage,
    pub profile: &'a ManufacturerProfile,
    pub retrier: &'a Retrier,
    pub row: &'a RawProductRow,
}

impl<'a> ScrapeContext<'a> {
    pub fn new(
        page: &'a dyn BrowserPage,
        profile: &'a ManufacturerProfile,
        retrier: &'a Retrier,
        row: &'a RawProductRow,
    ) -> Self {
        Self {
            page,
            profile,
            retrier,
            row,
        }
    }

    /// Throttled, retried navigation.
    pub async fn open(&self, url: &str) -> Result<()> {
        tracing::debug!(manufacturer = %self.profile.name, url, "Opening page");
        self.retrier
            .with_retry(&self.profile.name, || self.page.open(url))
            .await
    }

    /// Detail URL of the first result item on the current page that mentions
    /// the row's catalog number or product name.
    pub async fn scan_candidates(&self) -> Result<Option<String>> {
        let items = self
            .page
            .find_all(self.profile.selectors.result_item())
            .await?;
        Ok(find_candidate(&items, self.row))
    }
}

/// First element whose text contains, case-insensitively, the catalog number
/// or the product name, and which links somewhere.
pub fn find_candidate(items: &[PageElement], row: &RawProductRow) -> Option<String> {
    let needles: Vec<String> = [&row.catalog_number, &row.product_name]
        .into_iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();

    items
        .iter()
        .filter(|item| {
            let text = item.text.to_lowercase();
            needles.iter().any(|needle| text.contains(needle.as_str()))
        })
        .find_map(|item| item.href.clone())
}

#[async_trait]
pub trait LocateStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn locate(&self, ctx: &ScrapeContext<'_>) -> Result<Option<String>>;
}

/// Home page plus the site's own search box, when the profile has one.
pub struct SiteSearch;

#[async_trait]
impl LocateStrategy for SiteSearch {
    fn name(&self) -> &'static str {
        "site_search"
    }

    async fn locate(&self, ctx: &ScrapeContext<'_>) -> Result<Option<String>> {
        let selectors = &ctx.profile.selectors;
        ctx.open(&ctx.profile.base_url).await?;

        if let Some(input) = selectors.search_input.as_deref() {
            match ctx.page.type_text(input, &ctx.row.catalog_number).await {
                Ok(()) => {
                    ctx.retrier.throttle().await;
                    let submitted = match selectors.search_submit.as_deref() {
                        Some(submit) => ctx.page.click(submit).await,
                        None => ctx.page.press_enter(input).await,
                    };
                    if let Err(e) = submitted {
                        tracing::warn!(
                            manufacturer = %ctx.profile.name,
                            error = %e,
                            "Search submit failed, scanning current page"
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        manufacturer = %ctx.profile.name,
                        error = %e,
                        "Search input unavailable, continuing without it"
                    );
                }
            }
        }

        ctx.scan_candidates().await
    }
}

/// The profile's search URL with the formatted catalog number appended.
pub struct SearchUrl;

#[async_trait]
impl LocateStrategy for SearchUrl {
    fn name(&self) -> &'static str {
        "search_url"
    }

    async fn locate(&self, ctx: &ScrapeContext<'_>) -> Result<Option<String>> {
        let url = ctx.profile.product_url(&ctx.row.catalog_number);
        ctx.open(&url).await?;
        ctx.scan_candidates().await
    }
}

/// Walks the profile's category listings in order, stopping at the first match.
pub struct CategoryBrowse;

#[async_trait]
impl LocateStrategy for CategoryBrowse {
    fn name(&self) -> &'static str {
        "category_browse"
    }

    async fn locate(&self, ctx: &ScrapeContext<'_>) -> Result<Option<String>> {
        for page_url in &ctx.profile.category_pages {
            match ctx.open(page_url).await {
                Ok(()) => {}
                Err(e @ AppError::Navigation { .. }) => {
                    tracing::warn!(
                        manufacturer = %ctx.profile.name,
                        url = %page_url,
                        error = %e,
                        "Skipping unreachable category page"
                    );
                    continue;
                }
                Err(e) => return Err(e),
            }

            if let Some(found) = ctx.scan_candidates().await? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

pub fn default_strategies() -> Vec<Box<dyn LocateStrategy>> {
    vec![Box::new(SiteSearch), Box::new(SearchUrl), Box::new(CategoryBrowse)]
}
