use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::Value;

use super::{ApiError, ApiResponse, AppState, EnrichResponse, ManufacturerSummary};

pub async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
        "service": "labchem-enricher"
    }))
}

pub async fn list_manufacturers(
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<ManufacturerSummary>>> {
    let manufacturers = state
        .pipeline
        .registry()
        .profiles()
        .iter()
        .map(ManufacturerSummary::from)
        .collect();
    Json(ApiResponse::success(manufacturers))
}

/// Multipart upload: a `file` field with the CSV and an optional
/// `manufacturer` text field naming the rows to keep.
pub async fn enrich_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<EnrichResponse>, ApiError> {
    let mut file: Option<Vec<u8>> = None;
    let mut manufacturer: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => file = Some(field.bytes().await?.to_vec()),
            "manufacturer" => {
                let value = field.text().await?;
                let value = value.trim();
                if !value.is_empty() {
                    manufacturer = Some(value.to_string());
                }
            }
            other => tracing::debug!("Ignoring multipart field '{}'", other),
        }
    }

    let Some(file) = file else {
        return Err(ApiError::bad_request("No CSV file uploaded (expected field 'file')"));
    };

    let manufacturer =
        manufacturer.or_else(|| state.pipeline.default_manufacturer().map(str::to_string));
    tracing::info!(
        bytes = file.len(),
        manufacturer = manufacturer.as_deref().unwrap_or("*"),
        "Received enrichment upload"
    );

    let report = state
        .pipeline
        .run_csv(&file, manufacturer.as_deref())
        .await?;

    Ok(Json(EnrichResponse::from(report)))
}

pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
