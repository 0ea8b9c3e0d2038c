pub mod extract;
pub mod strategies;

use async_trait::async_trait;
use chrono::Utc;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use crate::browser::{BrowserPage, BrowserSession};
use crate::models::{EnrichedProduct, RawProductRow, ScrapeResult};
use crate::registry::{ManufacturerProfile, ManufacturerRegistry};
use crate::retry::Retrier;
use crate::utils::error::{AppError, Result};

pub use extract::{
    extract_fields, extract_pack_size, find_cas_number, find_labelled_cas_number, parse_price,
    ExtractedFields,
};
pub use strategies::{default_strategies, LocateStrategy, ScrapeContext};

/// Turns one input row into a [`ScrapeResult`]. Implementations never fail
/// the call itself: every problem is reported inside the result.
#[async_trait]
pub trait ProductScraper: Send + Sync {
    async fn scrape(&self, row: &RawProductRow) -> ScrapeResult;

    /// Releases shared resources once the job is done.
    async fn shutdown(&self) -> Result<()>;
}

/// Registry-driven scraper sharing one browser session between all rows of a job.
pub struct CatalogScraper {
    registry: Arc<ManufacturerRegistry>,
    session: Arc<dyn BrowserSession>,
    retrier: Retrier,
    strategies: Vec<Box<dyn LocateStrategy>>,
    item_timeout: Duration,
}

impl CatalogScraper {
    pub fn new(
        registry: Arc<ManufacturerRegistry>,
        session: Arc<dyn BrowserSession>,
        retrier: Retrier,
        item_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            session,
            retrier,
            strategies: default_strategies(),
            item_timeout,
        }
    }

    pub fn with_strategies(mut self, strategies: Vec<Box<dyn LocateStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    async fn scrape_profile(
        &self,
        profile: &ManufacturerProfile,
        row: &RawProductRow,
    ) -> Result<EnrichedProduct> {
        let page = self.session.new_page().await?;

        let outcome = AssertUnwindSafe(tokio::time::timeout(
            self.item_timeout,
            self.scrape_on_page(page.as_ref(), profile, row),
        ))
        .catch_unwind()
        .await;

        if let Err(e) = page.close().await {
            tracing::warn!(
                manufacturer = %profile.name,
                catalog_number = %row.catalog_number,
                error = %e,
                "Failed to close page"
            );
        }

        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(AppError::Timeout {
                seconds: self.item_timeout.as_secs(),
            }),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    async fn scrape_on_page(
        &self,
        page: &dyn BrowserPage,
        profile: &ManufacturerProfile,
        row: &RawProductRow,
    ) -> Result<EnrichedProduct> {
        let ctx = ScrapeContext::new(page, profile, &self.retrier, row);

        let mut detail_url = None;
        for strategy in &self.strategies {
            if let Some(url) = strategy.locate(&ctx).await? {
                tracing::debug!(
                    manufacturer = %profile.name,
                    catalog_number = %row.catalog_number,
                    strategy = strategy.name(),
                    url = %url,
                    "Located product"
                );
                detail_url = Some(url);
                break;
            }
        }

        let Some(url) = detail_url else {
            return Err(AppError::ProductNotFound {
                catalog_number: row.catalog_number.clone(),
            });
        };

        ctx.open(&url).await?;
        let fields = extract_fields(page, &profile.selectors).await?;
        Ok(build_product(profile, row, fields, page.current_url()))
    }
}

#[async_trait]
impl ProductScraper for CatalogScraper {
    async fn scrape(&self, row: &RawProductRow) -> ScrapeResult {
        let Some(profile) = self.registry.identify(&row.catalog_number, &row.company_name) else {
            tracing::warn!(
                company = %row.company_name,
                catalog_number = %row.catalog_number,
                "No manufacturer profile for row"
            );
            metrics::counter!("enricher_scrape_total", "outcome" => "failure").increment(1);
            let err = AppError::UnknownManufacturer {
                company_name: row.company_name.clone(),
                catalog_number: row.catalog_number.clone(),
            };
            return ScrapeResult::from_error(row.clone(), &err);
        };

        match self.scrape_profile(profile, row).await {
            Ok(product) => {
                tracing::info!(
                    manufacturer = %profile.name,
                    catalog_number = %row.catalog_number,
                    id = %product.id,
                    "Scraped product"
                );
                metrics::counter!("enricher_scrape_total", "outcome" => "success").increment(1);
                ScrapeResult::success(row.clone(), product)
            }
            Err(err) => {
                if matches!(err, AppError::ProductNotFound { .. }) {
                    tracing::info!(
                        manufacturer = %profile.name,
                        catalog_number = %row.catalog_number,
                        "Product not found"
                    );
                } else {
                    tracing::error!(
                        manufacturer = %profile.name,
                        catalog_number = %row.catalog_number,
                        error = %err,
                        "Scrape failed"
                    );
                }
                metrics::counter!("enricher_scrape_total", "outcome" => "failure").increment(1);
                ScrapeResult::from_error(row.clone(), &err)
            }
        }
    }

    async fn shutdown(&self) -> Result<()> {
        self.session.close().await
    }
}

/// Assembles the product record, falling back to the input row where the
/// page had nothing.
pub fn build_product(
    profile: &ManufacturerProfile,
    row: &RawProductRow,
    fields: ExtractedFields,
    page_url: String,
) -> EnrichedProduct {
    let pack_size = fields.pack_size.or_else(|| {
        extract_pack_size(
            [
                fields.description.as_deref().unwrap_or_default(),
                fields.name.as_deref().unwrap_or_default(),
                row.product_name.as_str(),
            ]
            .into_iter(),
        )
    });
    let cas_number = fields
        .cas_number
        .or_else(|| fields.description.as_deref().and_then(find_labelled_cas_number));

    EnrichedProduct {
        id: EnrichedProduct::derive_id(&profile.prefix, &row.catalog_number),
        name: fields.name.unwrap_or_else(|| row.product_name.clone()),
        description: fields
            .description
            .unwrap_or_else(|| row.product_name.clone()),
        manufacturer: profile.name.clone(),
        catalog_number: row.catalog_number.clone(),
        pack_size,
        cas_number,
        category: fields.category,
        price: fields.price,
        purity: fields.purity,
        image_url: fields.image_url,
        url: Some(page_url).filter(|u| !u.is_empty()),
        scraped_at: Utc::now(),
    }
}
