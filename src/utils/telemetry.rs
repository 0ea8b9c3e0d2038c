//! Tracing subscriber and Prometheus recorder setup for the binary.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LoggingConfig, MetricsConfig};
use crate::utils::error::{AppError, Result};

const LOG_FILE_PREFIX: &str = "labchem-enricher.log";

/// `RUST_LOG` wins over the configured filter.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| AppError::Internal(format!("Invalid log filter '{}': {}", config.filter, e)))
}

/// Installs the global subscriber: stdout, plus a daily rolling file when
/// `logging.directory` is set. Keep the returned guard alive until exit or
/// buffered file output is lost.
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = env_filter(config)?;

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|e| AppError::Internal(format!("Failed to install tracing subscriber: {}", e)))?;

    Ok(guard)
}

/// Installs the Prometheus recorder when metrics are enabled.
pub fn install_metrics(config: &MetricsConfig) -> Result<Option<PrometheusHandle>> {
    if !config.enabled {
        return Ok(None);
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| AppError::Internal(format!("Failed to install metrics recorder: {}", e)))?;

    metrics::describe_counter!("enricher_scrape_total", "Rows scraped, by outcome");
    metrics::describe_counter!("enricher_retry_attempts_total", "Failed scrape attempts");
    metrics::describe_histogram!(
        "enricher_batch_duration_seconds",
        metrics::Unit::Seconds,
        "Wall time of one concurrent batch"
    );

    tracing::info!("Prometheus metrics recorder installed");
    Ok(Some(handle))
}
