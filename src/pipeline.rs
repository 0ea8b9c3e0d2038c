//! Batch orchestration and the CSV → report enrichment pipeline.

use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::browser::{ChromeSessionFactory, SessionFactory};
use crate::config::{AppConfig, PipelineConfig, ScraperConfig};
use crate::ingest;
use crate::models::{BatchReport, EnrichedProduct, FailureKind, RawProductRow, ScrapeResult};
use crate::rate_limiter::RateLimiter;
use crate::registry::ManufacturerRegistry;
use crate::retry::{Retrier, RetryPolicy};
use crate::scraper::{CatalogScraper, ProductScraper};
use crate::utils::error::Result;

pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Runs rows through a scraper in fixed-size concurrent batches. Batch N+1
/// starts only after every task of batch N has settled.
///
/// One orchestrator serves one job: the scraper is shut down when
/// [`BatchOrchestrator::process_rows`] returns.
pub struct BatchOrchestrator {
    scraper: Arc<dyn ProductScraper>,
    batch_size: usize,
    job_deadline: Option<Duration>,
}

impl BatchOrchestrator {
    pub fn new(scraper: Arc<dyn ProductScraper>, batch_size: usize) -> Self {
        Self {
            scraper,
            batch_size: batch_size.max(1),
            job_deadline: None,
        }
    }

    /// Batches that have not started when `deadline` elapses are skipped and
    /// their rows reported as failures. A running batch is never interrupted.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.job_deadline = Some(deadline);
        self
    }

    pub async fn process_rows(&self, rows: Vec<RawProductRow>) -> Vec<ScrapeResult> {
        let deadline = self.job_deadline.map(|d| Instant::now() + d);
        let total_batches = rows.len().div_ceil(self.batch_size);
        let mut results = Vec::with_capacity(rows.len());

        for (index, batch) in rows.chunks(self.batch_size).enumerate() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                warn!(
                    batch = index + 1,
                    total_batches,
                    rows = batch.len(),
                    "Job deadline exceeded, skipping batch"
                );
                results.extend(batch.iter().map(|row| {
                    ScrapeResult::failure(
                        row.clone(),
                        FailureKind::DeadlineExceeded,
                        "Job deadline exceeded before the row was scraped",
                    )
                }));
                continue;
            }

            debug!(batch = index + 1, total_batches, rows = batch.len(), "Starting batch");
            let batch_start = Instant::now();

            let tasks: Vec<_> = batch
                .iter()
                .map(|row| {
                    let scraper = Arc::clone(&self.scraper);
                    let row = row.clone();
                    tokio::spawn(async move { scraper.scrape(&row).await })
                })
                .collect();

            for (row, outcome) in batch.iter().zip(join_all(tasks).await) {
                match outcome {
                    Ok(result) => results.push(result),
                    Err(e) => {
                        error!(
                            catalog_number = %row.catalog_number,
                            error = %e,
                            "Scrape task aborted"
                        );
                        results.push(ScrapeResult::failure(
                            row.clone(),
                            FailureKind::Panicked,
                            format!("Scrape task aborted: {}", e),
                        ));
                    }
                }
            }

            metrics::histogram!("enricher_batch_duration_seconds")
                .record(batch_start.elapsed().as_secs_f64());
        }

        if let Err(e) = self.scraper.shutdown().await {
            warn!("Failed to shut down scraper: {}", e);
        }

        results
    }

    /// Catalog-number form: every number is scraped as a row of `manufacturer`
    /// and only the products that were found are returned.
    pub async fn scrape_products(
        &self,
        manufacturer: &str,
        catalog_numbers: &[String],
    ) -> Vec<EnrichedProduct> {
        let rows = catalog_numbers
            .iter()
            .map(|c| RawProductRow::new(manufacturer, c, c))
            .collect();

        self.process_rows(rows)
            .await
            .into_iter()
            .filter_map(|r| r.product)
            .collect()
    }
}

/// CSV or rows in, [`BatchReport`] out. Each job gets its own browser
/// session, rate limiter and scraper.
pub struct EnrichmentPipeline {
    registry: Arc<ManufacturerRegistry>,
    sessions: Arc<dyn SessionFactory>,
    scraper_config: ScraperConfig,
    pipeline_config: PipelineConfig,
}

impl EnrichmentPipeline {
    pub fn new(
        registry: Arc<ManufacturerRegistry>,
        sessions: Arc<dyn SessionFactory>,
        scraper_config: ScraperConfig,
        pipeline_config: PipelineConfig,
    ) -> Self {
        Self {
            registry,
            sessions,
            scraper_config,
            pipeline_config,
        }
    }

    /// Pipeline backed by headless Chrome.
    pub fn from_config(registry: Arc<ManufacturerRegistry>, config: &AppConfig) -> Self {
        Self::new(
            registry,
            Arc::new(ChromeSessionFactory::new(config.scraper.clone())),
            config.scraper.clone(),
            config.pipeline.clone(),
        )
    }

    pub fn registry(&self) -> &Arc<ManufacturerRegistry> {
        &self.registry
    }

    /// Manufacturer used when a caller does not name one.
    pub fn default_manufacturer(&self) -> Option<&str> {
        self.pipeline_config.target_manufacturer.as_deref()
    }

    /// Rows whose company name equals `manufacturer`, ignoring case and
    /// surrounding whitespace. `None` keeps every row.
    pub fn filter_rows(rows: Vec<RawProductRow>, manufacturer: Option<&str>) -> Vec<RawProductRow> {
        match manufacturer {
            Some(name) => rows.into_iter().filter(|row| row.is_from(name)).collect(),
            None => rows,
        }
    }

    fn orchestrator(&self) -> BatchOrchestrator {
        let limiter = Arc::new(RateLimiter::new(self.scraper_config.requests_per_minute));
        let retrier = Retrier::new(RetryPolicy::from_config(&self.scraper_config), limiter);
        let scraper = CatalogScraper::new(
            Arc::clone(&self.registry),
            self.sessions.create(),
            retrier,
            Duration::from_secs(self.pipeline_config.item_timeout_secs),
        );

        BatchOrchestrator::new(Arc::new(scraper), self.pipeline_config.batch_size)
            .with_deadline(Duration::from_secs(self.pipeline_config.job_deadline_secs))
    }

    pub async fn run(&self, rows: Vec<RawProductRow>, manufacturer: Option<&str>) -> BatchReport {
        let started_at = Utc::now();
        let received = rows.len();
        let rows = Self::filter_rows(rows, manufacturer);

        info!(
            manufacturer = manufacturer.unwrap_or("*"),
            received,
            selected = rows.len(),
            "Starting enrichment job"
        );

        let results = if rows.is_empty() {
            Vec::new()
        } else {
            self.orchestrator().process_rows(rows).await
        };

        let report = BatchReport::new(manufacturer.map(str::to_string), results, started_at);
        info!(
            job_id = %report.job_id,
            total = report.stats.total,
            successful = report.stats.successful,
            success_rate = %report.stats.success_rate,
            "Enrichment job finished"
        );
        report
    }

    /// Parses `bytes` as CSV and runs the job. Only input errors are returned
    /// as `Err`; scraping problems end up inside the report.
    pub async fn run_csv(&self, bytes: &[u8], manufacturer: Option<&str>) -> Result<BatchReport> {
        let rows = ingest::parse_bytes(bytes)?;
        Ok(self.run(rows, manufacturer).await)
    }
}
