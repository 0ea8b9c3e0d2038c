use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::browser::BrowserPage;
use crate::registry::{FieldSelectors, ProductField};
use crate::utils::error::Result;

/// Raw field values read off a product detail page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFields {
    pub name: Option<String>,
    pub description: Option<String>,
    pub pack_size: Option<String>,
    pub cas_number: Option<String>,
    pub price: Option<Decimal>,
    pub purity: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

/// Reads every field the profile has a selector for. Missing elements leave
/// the field empty; only browser failures are errors.
pub async fn extract_fields(
    page: &dyn BrowserPage,
    selectors: &FieldSelectors,
) -> Result<ExtractedFields> {
    let mut fields = ExtractedFields::default();

    for field in ProductField::ALL {
        let Some(selector) = selectors.field(field) else {
            continue;
        };

        match field {
            ProductField::Image => {
                fields.image_url = page
                    .find_first(selector)
                    .await?
                    .and_then(|e| e.src.or(e.href));
            }
            _ => {
                let text = page.extract_text(selector).await?;
                match field {
                    ProductField::Name => fields.name = text,
                    ProductField::Description => fields.description = text,
                    ProductField::PackSize => fields.pack_size = text,
                    ProductField::CasNumber => {
                        fields.cas_number = text.as_deref().and_then(find_cas_number)
                    }
                    ProductField::Price => fields.price = text.as_deref().and_then(parse_price),
                    ProductField::Purity => fields.purity = text,
                    ProductField::Category => fields.category = text,
                    ProductField::Image => {}
                }
            }
        }
    }

    Ok(fields)
}

fn pack_with_quantity() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b\d+(?:\.\d+)?\s*(?:µg|ug|mg|ml|kg|g|l|pcs|pieces|pack|box)\b")
            .expect("pack size pattern")
    })
}

fn pack_count() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:pack|box|case|set)\s+of\s+\d+(?:\s*(?:pcs|pieces|units|nos)\b)?")
            .expect("pack count pattern")
    })
}

fn cas_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{2,7})-(\d{2})-(\d)\b").expect("CAS pattern"))
}

fn labelled_cas_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bCAS(?:\s*(?:No\.?|Number|RN|#))?\s*[:#]?\s*(\d{2,7}-\d{2}-\d)\b")
            .expect("labelled CAS pattern")
    })
}

fn price_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d{1,3}(?:,\d{2,3})+(?:\.\d+)?|\d+(?:\.\d+)?)").expect("price pattern")
    })
}

/// First pack-size mention across `texts`, in order. Quantities with a unit
/// ("500 ml", "2.5L") are preferred over counts ("Pack of 100"). A bare
/// "pack" or "box" is not a pack size.
pub fn extract_pack_size<'a>(texts: impl IntoIterator<Item = &'a str> + Clone) -> Option<String> {
    for pattern in [pack_with_quantity(), pack_count()] {
        let found = texts
            .clone()
            .into_iter()
            .find_map(|text| pattern.find(text).map(|m| m.as_str().trim().to_string()));
        if found.is_some() {
            return found;
        }
    }
    None
}

/// CAS check digit: weighted sum of the other digits, right to left, mod 10.
pub fn is_valid_cas(cas: &str) -> bool {
    let Some(caps) = cas_pattern().captures(cas.trim()) else {
        return false;
    };
    if caps.get(0).map(|m| m.as_str()) != Some(cas.trim()) {
        return false;
    }

    let body: Vec<u32> = format!("{}{}", &caps[1], &caps[2])
        .chars()
        .filter_map(|c| c.to_digit(10))
        .collect();
    let check = caps[3].parse::<u32>().unwrap_or(10);

    let sum: u32 = body
        .iter()
        .rev()
        .enumerate()
        .map(|(i, d)| (i as u32 + 1) * d)
        .sum();

    sum % 10 == check
}

/// First CAS number in `text` that passes the check-digit test.
pub fn find_cas_number(text: &str) -> Option<String> {
    cas_pattern()
        .find_iter(text)
        .map(|m| m.as_str())
        .find(|candidate| is_valid_cas(candidate))
        .map(str::to_string)
}

/// First valid CAS number that is introduced by a "CAS" label ("CAS 64-17-5",
/// "CAS No.: 67-64-1"). Used on free text where bare number triples are
/// often lot or catalog codes.
pub fn find_labelled_cas_number(text: &str) -> Option<String> {
    labelled_cas_pattern()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .find(|candidate| is_valid_cas(candidate))
        .map(str::to_string)
}

/// Numeric price from text like "₹1,250.00" or "Rs. 450 / pack".
pub fn parse_price(text: &str) -> Option<Decimal> {
    let captures = price_pattern().captures(text)?;
    let price_str = captures.get(1)?.as_str().replace(',', "");
    Decimal::from_str(&price_str).ok()
}
