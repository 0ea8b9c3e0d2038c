pub mod browser;
pub mod config;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod rate_limiter;
pub mod registry;
pub mod retry;
pub mod scraper;
pub mod utils;
pub mod web;

// Re-export commonly used types
pub use config::AppConfig;
pub use models::{
    BatchReport, BatchStats, EnrichedProduct, FailureKind, RawProductRow, ScrapeResult,
};
pub use pipeline::{BatchOrchestrator, EnrichmentPipeline};
pub use registry::{ManufacturerProfile, ManufacturerRegistry};
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
