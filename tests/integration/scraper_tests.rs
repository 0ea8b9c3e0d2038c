use super::*;
use labchem_enricher::{scraper::ProductScraper, FailureKind, RawProductRow};
use rust_decimal::Decimal;
use std::str::FromStr;

#[tokio::test]
async fn test_site_search_extracts_all_fields() -> anyhow::Result<()> {
    let site = Arc::new(abdos_site());
    let scraper = test_scraper(Arc::clone(&site));

    let row = RawProductRow::new("Abdos", "P10203", "Test Tube 15ml");
    let result = scraper.scrape(&row).await;
    assert!(result.success, "unexpected failure: {:?}", result.error);

    let product = result.product.expect("product");
    assert_eq!(product.id, "abdos-P10203");
    assert_eq!(product.catalog_number, "P10203");
    assert_eq!(product.manufacturer, "Abdos");
    assert_eq!(product.name, "Test Tube, Borosilicate, 15 ml");
    assert_eq!(product.description, "Rimless test tube for general lab use.");
    assert_eq!(product.pack_size.as_deref(), Some("Pack of 100"));
    assert_eq!(product.cas_number.as_deref(), Some("7732-18-5"));
    assert_eq!(product.category.as_deref(), Some("Labware"));
    assert_eq!(product.price, Some(Decimal::from_str("1250.00")?));
    assert_eq!(
        product.image_url.as_deref(),
        Some("https://www.abdoslifesciences.com/media/p10203.jpg")
    );
    assert_eq!(
        product.url.as_deref(),
        Some("https://www.abdoslifesciences.com/products/p10203")
    );

    assert_eq!(site.pages_opened.load(Ordering::SeqCst), 1);
    assert_eq!(site.pages_closed.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_site_search_without_submit_button_uses_enter() -> anyhow::Result<()> {
    let site = Arc::new(borosil_site());
    let scraper = test_scraper(Arc::clone(&site));

    let row = RawProductRow::new("Borosil", "1000", "Beaker 50ml");
    let result = scraper.scrape(&row).await;
    assert!(result.success, "unexpected failure: {:?}", result.error);

    let product = result.product.expect("product");
    assert_eq!(product.id, "borosil-1000");
    assert_eq!(product.name, "Beaker, Low Form, with Spout");
    assert_eq!(product.price, Some(Decimal::from_str("1140.00")?));
    assert_eq!(
        product.url.as_deref(),
        Some("https://www.borosilscientific.com/products/1000-beaker")
    );

    // Found through the site search; the search URL and categories are never needed.
    assert_eq!(site.visit_count(&format!("{}/search?q=1000", BOROSIL_HOME)), 1);
    assert!(!site.visits().iter().any(|v| v.contains("/collections/")));
    Ok(())
}

#[tokio::test]
async fn test_falls_back_to_category_pages_and_matches_by_name() -> anyhow::Result<()> {
    let site = Arc::new(abdos_site());
    let scraper = test_scraper(Arc::clone(&site));

    let row = RawProductRow::new("Abdos", "E5001", "Petri Dish 90mm");
    let result = scraper.scrape(&row).await;
    assert!(result.success, "unexpected failure: {:?}", result.error);

    let product = result.product.expect("product");
    assert_eq!(product.id, "abdos-E5001");
    // No selector hit for these: pack size comes from the description, but
    // an unlabelled number there is not taken as the CAS.
    assert_eq!(product.pack_size.as_deref(), Some("500 pcs"));
    assert_eq!(product.cas_number, None);
    assert_eq!(product.price, None);

    let visits = site.visits();
    assert!(visits.contains(&format!("{}/search?q=e5001", ABDOS_HOME)));
    assert_eq!(site.visit_count(&format!("{}/labware", ABDOS_HOME)), 1);
    // Browsing stops at the first category with a match.
    assert_eq!(site.visit_count(&format!("{}/glassware", ABDOS_HOME)), 0);
    Ok(())
}

#[tokio::test]
async fn test_category_order_is_respected() -> anyhow::Result<()> {
    let site = Arc::new(abdos_site());
    let scraper = test_scraper(Arc::clone(&site));

    let row = RawProductRow::new("Abdos", "P20001", "Volumetric Flask");
    let result = scraper.scrape(&row).await;
    assert!(result.success);
    assert_eq!(result.product.unwrap().name, "Volumetric Flask Class A 250 ml");

    assert_eq!(site.visit_count(&format!("{}/plasticware", ABDOS_HOME)), 1);
    assert_eq!(site.visit_count(&format!("{}/filtration", ABDOS_HOME)), 0);
    Ok(())
}

#[tokio::test]
async fn test_product_not_found_is_a_plain_failure() -> anyhow::Result<()> {
    let site = Arc::new(abdos_site());
    let scraper = test_scraper(Arc::clone(&site));

    let row = RawProductRow::new("Abdos", "P99999", "Discontinued Item");
    let result = scraper.scrape(&row).await;

    assert!(!result.success);
    assert!(result.product.is_none());
    assert_eq!(result.error.as_deref(), Some("Product not found"));
    assert_eq!(result.error_kind, Some(FailureKind::NotFound));
    assert_eq!(site.pages_closed.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_transient_navigation_errors_are_retried() -> anyhow::Result<()> {
    let detail = format!("{}/products/p10203", ABDOS_HOME);
    let site = Arc::new(abdos_site().fail(&detail, 2));
    let scraper = test_scraper(Arc::clone(&site));

    let row = RawProductRow::new("Abdos", "P10203", "Test Tube 15ml");
    let result = scraper.scrape(&row).await;

    assert!(result.success, "unexpected failure: {:?}", result.error);
    assert_eq!(site.visit_count(&detail), 3);
    Ok(())
}

#[tokio::test]
async fn test_exhausted_retries_become_row_failure() -> anyhow::Result<()> {
    let detail = format!("{}/products/p10203", ABDOS_HOME);
    let site = Arc::new(abdos_site().fail(&detail, 10));
    let scraper = test_scraper(Arc::clone(&site));

    let row = RawProductRow::new("Abdos", "P10203", "Test Tube 15ml");
    let result = scraper.scrape(&row).await;

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(FailureKind::Scraping));
    let error = result.error.unwrap();
    assert!(error.contains(&detail));
    assert!(error.contains("ERR_CONNECTION_RESET"));
    // One attempt plus three retries.
    assert_eq!(site.visit_count(&detail), 4);
    assert_eq!(site.pages_closed.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_company_name_wins_over_catalog_pattern() -> anyhow::Result<()> {
    let site = Arc::new(abdos_site());
    let scraper = test_scraper(Arc::clone(&site));

    // "1000" would match the Borosil pattern, but the company is Abdos.
    let row = RawProductRow::new("Abdos", "1000", "Nonexistent");
    let result = scraper.scrape(&row).await;
    assert_eq!(result.error_kind, Some(FailureKind::NotFound));
    assert!(site.visits().iter().any(|v| v.starts_with(ABDOS_HOME)));
    Ok(())
}

#[tokio::test]
async fn test_unknown_manufacturer_touches_no_page() -> anyhow::Result<()> {
    let site = Arc::new(abdos_site());
    let scraper = test_scraper(Arc::clone(&site));

    let row = RawProductRow::new("Acme Glass", "zz-77", "Widget");
    let result = scraper.scrape(&row).await;

    assert_eq!(result.error_kind, Some(FailureKind::UnknownManufacturer));
    assert_eq!(site.pages_opened.load(Ordering::SeqCst), 0);
    assert!(site.visits().is_empty());
    Ok(())
}
