use super::*;
use labchem_enricher::{ingest, FailureKind};

#[tokio::test]
async fn test_only_target_manufacturer_rows_are_scraped() -> anyhow::Result<()> {
    let site = Arc::new(abdos_site());
    let pipeline = test_pipeline(Arc::clone(&site));

    let report = pipeline.run_csv(MIXED_CSV.as_bytes(), Some("Abdos")).await?;

    assert_eq!(report.results.len(), 3);
    assert!(report.results.iter().all(|r| r.input.is_from("Abdos")));
    let numbers: Vec<_> = report
        .results
        .iter()
        .map(|r| r.input.catalog_number.as_str())
        .collect();
    assert_eq!(numbers, vec!["P10203", "E5001", "P99999"]);

    assert_eq!(report.stats.total, 3);
    assert_eq!(report.stats.successful, 2);
    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.stats.success_rate, "66.67");
    assert_eq!(report.manufacturer.as_deref(), Some("Abdos"));
    assert!(report.finished_at >= report.started_at);

    let missing = &report.results[2];
    assert_eq!(missing.error_kind, Some(FailureKind::NotFound));

    let ids: Vec<_> = report.successful_products().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["abdos-P10203", "abdos-E5001"]);
    Ok(())
}

#[tokio::test]
async fn test_pages_and_session_are_released() -> anyhow::Result<()> {
    let detail = format!("{}/products/p10203", ABDOS_HOME);
    let site = Arc::new(abdos_site().fail(&detail, 10));
    let pipeline = test_pipeline(Arc::clone(&site));

    let report = pipeline.run_csv(MIXED_CSV.as_bytes(), Some("Abdos")).await?;
    assert_eq!(report.stats.successful, 1);

    assert_eq!(site.pages_opened.load(Ordering::SeqCst), 3);
    assert_eq!(site.pages_closed.load(Ordering::SeqCst), 3);
    assert_eq!(site.sessions_closed.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_all_manufacturers_when_no_filter() -> anyhow::Result<()> {
    let site = Arc::new(abdos_site());
    let pipeline = test_pipeline(Arc::clone(&site));

    let rows = ingest::parse_bytes(MIXED_CSV.as_bytes())?;
    let report = pipeline.run(rows, None).await;

    // Every row gets a result; rows on other sites are simply not found here.
    assert_eq!(report.stats.total, 7);
    assert_eq!(report.stats.successful, 2);
    assert!(report
        .results
        .iter()
        .filter(|r| !r.input.is_from("Abdos"))
        .all(|r| !r.success));
    assert_eq!(site.sessions_closed.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_every_row_failing_still_reports_stats() -> anyhow::Result<()> {
    let site = Arc::new(FakeSite::new());
    let pipeline = test_pipeline(Arc::clone(&site));

    let csv = "Company's Name,Cat. No,Product Name\nAbdos,P1,Gone\nAbdos,P2,Also Gone\n";
    let report = pipeline.run_csv(csv.as_bytes(), Some("Abdos")).await?;

    assert_eq!(report.stats.total, 2);
    assert_eq!(report.stats.successful, 0);
    assert_eq!(report.stats.success_rate, "0.00");
    Ok(())
}

#[tokio::test]
async fn test_rows_with_empty_catalog_number_never_reach_scraper() -> anyhow::Result<()> {
    let site = Arc::new(abdos_site());
    let pipeline = test_pipeline(Arc::clone(&site));

    let csv = "Company's Name,Cat. No,Product Name\nAbdos,,Test Tube\nAbdos,P10203,Test Tube 15ml\n";
    let report = pipeline.run_csv(csv.as_bytes(), Some("Abdos")).await?;

    assert_eq!(report.stats.total, 1);
    assert_eq!(site.pages_opened.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_malformed_csv_fails_before_any_browsing() -> anyhow::Result<()> {
    let site = Arc::new(abdos_site());
    let pipeline = test_pipeline(Arc::clone(&site));

    let err = pipeline
        .run_csv(b"Company,Catalog\nAbdos,P10203\n", Some("Abdos"))
        .await
        .unwrap_err();

    assert!(err.is_input_error());
    assert!(site.visits().is_empty());
    assert_eq!(site.sessions_closed.load(Ordering::SeqCst), 0);
    Ok(())
}
