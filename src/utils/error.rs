use thiserror::Error;

/// Column headers the CSV ingest expects, in the order they are reported.
pub const EXPECTED_HEADERS: [&str; 3] = ["Company's Name", "Cat. No", "Product Name"];

#[derive(Error, Debug)]
pub enum AppError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid CSV: {message}")]
    InvalidCsv { message: String },

    #[error("No valid rows found in CSV")]
    NoValidRows,

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Profile file error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Invalid catalog pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Invalid selector: {selector}")]
    InvalidSelector { selector: String },

    #[error("Element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("Unknown manufacturer for {company_name} / {catalog_number}")]
    UnknownManufacturer {
        company_name: String,
        catalog_number: String,
    },

    #[error("Product not found")]
    ProductNotFound { catalog_number: String },

    #[error("Timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(format!("{}", err))
    }
}

impl AppError {
    /// Errors raised before any scraping starts. These are the only ones that
    /// reach the caller of the pipeline; everything else is folded into a row.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            AppError::Csv(_) | AppError::InvalidCsv { .. } | AppError::NoValidRows
        )
    }

    /// Human-readable hint naming the schema the ingest expects.
    pub fn expected_schema() -> String {
        format!(
            "Expected CSV columns: {}",
            EXPECTED_HEADERS
                .iter()
                .map(|h| format!("\"{}\"", h))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
