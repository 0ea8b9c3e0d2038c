use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::PageElement;
use crate::utils::error::{AppError, Result};

pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|_| AppError::InvalidSelector {
        selector: selector.to_string(),
    })
}

/// Visible text of an element with whitespace collapsed.
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// All elements matching `selector`, in document order. `href`/`src`
/// attributes are resolved against `base_url` when it parses.
pub fn select_all(html: &str, selector: &str, base_url: Option<&str>) -> Result<Vec<PageElement>> {
    let css_selector = parse_selector(selector)?;
    let document = Html::parse_document(html);
    let base = base_url.and_then(|u| Url::parse(u).ok());

    let resolve = |value: Option<&str>| -> Option<String> {
        let value = value?.trim();
        if value.is_empty() {
            return None;
        }
        match &base {
            Some(base) => base.join(value).map(|u| u.to_string()).ok(),
            None => Some(value.to_string()),
        }
    };

    Ok(document
        .select(&css_selector)
        .map(|element| PageElement {
            text: element_text(element),
            href: resolve(element.value().attr("href")),
            src: resolve(element.value().attr("src")),
        })
        .collect())
}
