use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::product::{EnrichedProduct, RawProductRow};
use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnknownManufacturer,
    NotFound,
    Scraping,
    Timeout,
    DeadlineExceeded,
    Panicked,
}

impl From<&AppError> for FailureKind {
    fn from(err: &AppError) -> Self {
        match err {
            AppError::UnknownManufacturer { .. } => FailureKind::UnknownManufacturer,
            AppError::ProductNotFound { .. } => FailureKind::NotFound,
            AppError::Timeout { .. } => FailureKind::Timeout,
            _ => FailureKind::Scraping,
        }
    }
}

/// Outcome for a single input row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResult {
    pub success: bool,
    pub input: RawProductRow,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<EnrichedProduct>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
}

impl ScrapeResult {
    pub fn success(input: RawProductRow, product: EnrichedProduct) -> Self {
        Self {
            success: true,
            input,
            product: Some(product),
            error: None,
            error_kind: None,
        }
    }

    pub fn failure(input: RawProductRow, kind: FailureKind, error: impl Into<String>) -> Self {
        Self {
            success: false,
            input,
            product: None,
            error: Some(error.into()),
            error_kind: Some(kind),
        }
    }

    pub fn from_error(input: RawProductRow, err: &AppError) -> Self {
        Self::failure(input, FailureKind::from(err), err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Percentage with two decimals, e.g. `"66.67"`.
    pub success_rate: String,
}

impl BatchStats {
    pub fn from_results(results: &[ScrapeResult]) -> Self {
        let total = results.len();
        let successful = results.iter().filter(|r| r.success).count();
        let rate = if total == 0 {
            0.0
        } else {
            successful as f64 / total as f64 * 100.0
        };

        Self {
            total,
            successful,
            failed: total - successful,
            success_rate: format!("{:.2}", rate),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub job_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    pub results: Vec<ScrapeResult>,
    pub stats: BatchStats,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchReport {
    pub fn new(
        manufacturer: Option<String>,
        results: Vec<ScrapeResult>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let stats = BatchStats::from_results(&results);
        Self {
            job_id: Uuid::new_v4(),
            manufacturer,
            results,
            stats,
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn successful_products(&self) -> impl Iterator<Item = &EnrichedProduct> {
        self.results.iter().filter_map(|r| r.product.as_ref())
    }
}
