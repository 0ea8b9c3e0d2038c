use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// One input record as read from the uploaded CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RawProductRow {
    #[validate(length(min = 1, message = "company name is required"))]
    pub company_name: String,
    #[validate(length(min = 1, message = "catalog number is required"))]
    pub catalog_number: String,
    #[validate(length(min = 1, message = "product name is required"))]
    pub product_name: String,
}

impl RawProductRow {
    /// Builds a row with every field trimmed.
    pub fn new(
        company_name: impl AsRef<str>,
        catalog_number: impl AsRef<str>,
        product_name: impl AsRef<str>,
    ) -> Self {
        Self {
            company_name: company_name.as_ref().trim().to_string(),
            catalog_number: catalog_number.as_ref().trim().to_string(),
            product_name: product_name.as_ref().trim().to_string(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Case-insensitive, whitespace-trimmed company comparison.
    pub fn is_from(&self, manufacturer: &str) -> bool {
        self.company_name.trim().eq_ignore_ascii_case(manufacturer.trim())
    }
}

/// Product record produced by a successful scrape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedProduct {
    pub id: String,
    pub name: String,
    pub description: String,
    pub manufacturer: String,
    pub catalog_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pack_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cas_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

impl EnrichedProduct {
    /// Derived id: `<prefix>-<catalog number>`.
    pub fn derive_id(prefix: &str, catalog_number: &str) -> String {
        format!("{}-{}", prefix, catalog_number)
    }
}
