use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{BatchReport, BatchStats, ScrapeResult};
use crate::registry::{ManufacturerProfile, UrlFormatter};
use crate::utils::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            timestamp: Utc::now(),
        }
    }
}

/// Body of `POST /api/v1/enrich`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichResponse {
    pub success: bool,
    pub job_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    pub results: Vec<ScrapeResult>,
    pub stats: BatchStats,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl From<BatchReport> for EnrichResponse {
    fn from(report: BatchReport) -> Self {
        Self {
            success: true,
            job_id: report.job_id,
            manufacturer: report.manufacturer,
            results: report.results,
            stats: report.stats,
            started_at: report.started_at,
            finished_at: report.finished_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManufacturerSummary {
    pub name: String,
    pub prefix: String,
    pub aliases: Vec<String>,
    pub base_url: String,
    pub catalog_pattern: String,
    pub url_formatter: UrlFormatter,
}

impl From<&ManufacturerProfile> for ManufacturerSummary {
    fn from(profile: &ManufacturerProfile) -> Self {
        Self {
            name: profile.name.clone(),
            prefix: profile.prefix.clone(),
            aliases: profile.aliases.clone(),
            base_url: profile.base_url.clone(),
            catalog_pattern: profile.catalog_pattern.as_str().to_string(),
            url_formatter: profile.url_formatter,
        }
    }
}

/// Failure body: `{ success: false, code, error, details? }`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub code: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest {
        message: String,
        details: Option<String>,
    },
    PayloadTooLarge(String),
    InternalServerError(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest {
            message: msg.into(),
            details: None,
        }
    }

    /// Bad request whose details name the expected CSV columns.
    pub fn invalid_csv(msg: impl Into<String>) -> Self {
        Self::BadRequest {
            message: msg.into(),
            details: Some(AppError::expected_schema()),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalServerError(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest { .. } => "BAD_REQUEST",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn into_body(self) -> ErrorBody {
        let code = self.error_code().to_string();
        let (error, details) = match self {
            ApiError::BadRequest { message, details } => (message, details),
            ApiError::PayloadTooLarge(msg) | ApiError::InternalServerError(msg) => (msg, None),
        };
        ErrorBody {
            success: false,
            code,
            error,
            details,
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        if err.is_input_error() {
            ApiError::invalid_csv(err.to_string())
        } else {
            tracing::error!("Enrichment request failed: {}", err);
            ApiError::internal(err.to_string())
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(err.body_text())
        } else {
            ApiError::bad_request(format!("Malformed upload: {}", err.body_text()))
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self.into_body())).into_response()
    }
}
