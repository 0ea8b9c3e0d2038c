//! Manufacturer profiles: where to search, what to select, how to build URLs.
//!
//! The registry is built once at startup from the embedded
//! `config/manufacturers.toml` (plus an optional operator file) and then only
//! read. Components receive it as `Arc<ManufacturerRegistry>`.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use url::Url;

use crate::utils::error::{AppError, Result};

const BUILTIN_PROFILES: &str = include_str!("../config/manufacturers.toml");

/// Characters left untouched by `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// How a catalog number is turned into the tail of a product/search URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlFormatter {
    /// Strip everything but ASCII letters and digits, then lowercase.
    Compact,
    /// Percent-encode the catalog number as-is.
    #[default]
    Encoded,
}

impl UrlFormatter {
    pub fn apply(&self, catalog_number: &str) -> String {
        match self {
            UrlFormatter::Compact => catalog_number
                .chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
                .to_ascii_lowercase(),
            UrlFormatter::Encoded => utf8_percent_encode(catalog_number, COMPONENT).to_string(),
        }
    }
}

/// Logical product fields a profile may know how to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductField {
    Name,
    Description,
    PackSize,
    CasNumber,
    Price,
    Purity,
    Category,
    Image,
}

impl ProductField {
    pub const ALL: [ProductField; 8] = [
        ProductField::Name,
        ProductField::Description,
        ProductField::PackSize,
        ProductField::CasNumber,
        ProductField::Price,
        ProductField::Purity,
        ProductField::Category,
        ProductField::Image,
    ];
}

/// DOM selectors for one manufacturer site. Every entry is optional; use the
/// `has_*`/`field` accessors rather than assuming a selector exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSelectors {
    pub search_input: Option<String>,
    pub search_submit: Option<String>,
    pub result_item: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub pack_size: Option<String>,
    pub cas_number: Option<String>,
    pub price: Option<String>,
    pub purity: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
}

impl FieldSelectors {
    pub fn field(&self, field: ProductField) -> Option<&str> {
        let selector = match field {
            ProductField::Name => &self.name,
            ProductField::Description => &self.description,
            ProductField::PackSize => &self.pack_size,
            ProductField::CasNumber => &self.cas_number,
            ProductField::Price => &self.price,
            ProductField::Purity => &self.purity,
            ProductField::Category => &self.category,
            ProductField::Image => &self.image,
        };
        selector.as_deref()
    }

    pub fn has_field(&self, field: ProductField) -> bool {
        self.field(field).is_some()
    }

    pub fn has_search(&self) -> bool {
        self.search_input.is_some()
    }

    /// Selector for candidate result links; falls back to every anchor.
    pub fn result_item(&self) -> &str {
        self.result_item.as_deref().unwrap_or("a")
    }

    fn all(&self) -> impl Iterator<Item = &str> {
        [
            &self.search_input,
            &self.search_submit,
            &self.result_item,
            &self.name,
            &self.description,
            &self.pack_size,
            &self.cas_number,
            &self.price,
            &self.purity,
            &self.category,
            &self.image,
        ]
        .into_iter()
        .filter_map(|s| s.as_deref())
    }
}

/// Profile as written in a TOML profile file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileDefinition {
    pub name: String,
    pub prefix: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub base_url: String,
    pub search_url: String,
    pub catalog_pattern: String,
    #[serde(default)]
    pub url_formatter: UrlFormatter,
    #[serde(default)]
    pub category_pages: Vec<String>,
    #[serde(default)]
    pub selectors: FieldSelectors,
}

#[derive(Debug, Deserialize)]
struct ProfileFile {
    #[serde(default, rename = "manufacturer")]
    manufacturers: Vec<ProfileDefinition>,
}

#[derive(Debug, Clone)]
pub struct ManufacturerProfile {
    pub name: String,
    pub prefix: String,
    pub aliases: Vec<String>,
    pub base_url: String,
    pub search_url: String,
    pub catalog_pattern: Regex,
    pub url_formatter: UrlFormatter,
    pub category_pages: Vec<String>,
    pub selectors: FieldSelectors,
}

impl ManufacturerProfile {
    pub fn compile(def: ProfileDefinition) -> Result<Self> {
        if def.name.trim().is_empty() || def.prefix.trim().is_empty() {
            return Err(AppError::Registry(
                "Profile name and prefix must not be empty".into(),
            ));
        }

        for url in std::iter::once(&def.base_url)
            .chain(std::iter::once(&def.search_url))
            .chain(def.category_pages.iter())
        {
            Url::parse(url).map_err(|e| {
                AppError::Registry(format!("{}: invalid URL '{}': {}", def.name, url, e))
            })?;
        }

        for selector in def.selectors.all() {
            if Selector::parse(selector).is_err() {
                return Err(AppError::InvalidSelector {
                    selector: selector.to_string(),
                });
            }
        }

        Ok(Self {
            catalog_pattern: Regex::new(&def.catalog_pattern)?,
            name: def.name,
            prefix: def.prefix,
            aliases: def.aliases,
            base_url: def.base_url,
            search_url: def.search_url,
            url_formatter: def.url_formatter,
            category_pages: def.category_pages,
            selectors: def.selectors,
        })
    }

    /// Search/product URL for a catalog number, using this profile's formatter.
    pub fn product_url(&self, catalog_number: &str) -> String {
        format_product_url(self, catalog_number)
    }

    pub fn matches_catalog_number(&self, catalog_number: &str) -> bool {
        self.catalog_pattern.is_match(catalog_number)
    }

    fn lookup_keys(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(&self.name)
            .chain(self.aliases.iter())
            .map(|n| normalize_company(n))
    }
}

/// Appends the formatted catalog number to the profile's search URL.
pub fn format_product_url(profile: &ManufacturerProfile, catalog_number: &str) -> String {
    format!(
        "{}{}",
        profile.search_url,
        profile.url_formatter.apply(catalog_number)
    )
}

fn normalize_company(name: &str) -> String {
    name.trim().to_uppercase()
}

#[derive(Debug, Clone)]
pub struct ManufacturerRegistry {
    profiles: Vec<ManufacturerProfile>,
    by_company: HashMap<String, usize>,
}

impl ManufacturerRegistry {
    /// Registry holding only the built-in profiles.
    pub fn builtin() -> Result<Self> {
        Self::from_toml(BUILTIN_PROFILES)
    }

    /// Built-in profiles followed by the profiles in `extra`, if given.
    pub fn load(extra: Option<&Path>) -> Result<Self> {
        let mut definitions = parse_definitions(BUILTIN_PROFILES)?;
        if let Some(path) = extra {
            let content = std::fs::read_to_string(path)?;
            definitions.extend(parse_definitions(&content)?);
            tracing::info!("Loaded extra manufacturer profiles from {}", path.display());
        }
        Self::from_definitions(definitions)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Self::from_definitions(parse_definitions(content)?)
    }

    pub fn from_definitions(definitions: Vec<ProfileDefinition>) -> Result<Self> {
        let mut profiles = Vec::with_capacity(definitions.len());
        let mut by_company = HashMap::new();

        for def in definitions {
            let profile = ManufacturerProfile::compile(def)?;
            let index = profiles.len();
            for key in profile.lookup_keys() {
                if by_company.insert(key.clone(), index).is_some() {
                    return Err(AppError::Registry(format!(
                        "Duplicate manufacturer name or alias: {}",
                        key
                    )));
                }
            }
            profiles.push(profile);
        }

        tracing::debug!("Manufacturer registry ready with {} profiles", profiles.len());
        Ok(Self {
            profiles,
            by_company,
        })
    }

    /// Finds the profile for a row. An exact (trimmed, case-insensitive)
    /// company match always wins; otherwise the first profile, in definition
    /// order, whose catalog pattern matches the raw catalog number.
    pub fn identify(
        &self,
        catalog_number: &str,
        company_name: &str,
    ) -> Option<&ManufacturerProfile> {
        if let Some(&index) = self.by_company.get(&normalize_company(company_name)) {
            return Some(&self.profiles[index]);
        }

        self.profiles
            .iter()
            .find(|p| p.matches_catalog_number(catalog_number))
    }

    pub fn get(&self, name: &str) -> Option<&ManufacturerProfile> {
        self.by_company
            .get(&normalize_company(name))
            .map(|&i| &self.profiles[i])
    }

    pub fn profiles(&self) -> &[ManufacturerProfile] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

fn parse_definitions(content: &str) -> Result<Vec<ProfileDefinition>> {
    let file: ProfileFile = toml::from_str(content)?;
    Ok(file.manufacturers)
}
