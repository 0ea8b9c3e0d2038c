use super::*;
use axum::http::StatusCode;
use labchem_enricher::web::create_router;

fn app(site: FakeSite) -> Router {
    create_router(create_test_app_state(Arc::new(site)))
}

#[tokio::test]
async fn test_health_check() -> anyhow::Result<()> {
    let response = make_request(app(FakeSite::new()), Method::GET, "/health", None).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await?;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "labchem-enricher");
    Ok(())
}

#[tokio::test]
async fn test_list_manufacturers_in_lookup_order() -> anyhow::Result<()> {
    let response =
        make_request(app(FakeSite::new()), Method::GET, "/api/v1/manufacturers", None).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await?;
    assert_eq!(body["success"], true);
    let names: Vec<_> = body["data"]
        .as_array()
        .expect("manufacturer list")
        .iter()
        .map(|m| m["name"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(names, vec!["Abdos", "Borosil", "Tarsons", "Sigma-Aldrich"]);
    assert_eq!(body["data"][0]["catalogPattern"], "^[PE]");
    assert_eq!(body["data"][0]["urlFormatter"], "compact");
    Ok(())
}

#[tokio::test]
async fn test_enrich_upload_returns_report() -> anyhow::Result<()> {
    let body = multipart_body(Some(MIXED_CSV), Some("Abdos"));
    let response =
        make_request(app(abdos_site()), Method::POST, "/api/v1/enrich", Some(body)).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await?;
    assert_eq!(json["success"], true);
    assert!(json["jobId"].is_string());
    assert_eq!(json["results"].as_array().map(Vec::len), Some(3));
    assert_eq!(json["stats"]["total"], 3);
    assert_eq!(json["stats"]["successful"], 2);
    assert_eq!(json["stats"]["successRate"], "66.67");

    let first = &json["results"][0];
    assert_eq!(first["success"], true);
    assert_eq!(first["product"]["id"], "abdos-P10203");
    assert_eq!(first["product"]["catalogNumber"], "P10203");
    assert_eq!(first["input"]["companyName"], "Abdos");

    let missing = &json["results"][2];
    assert_eq!(missing["success"], false);
    assert_eq!(missing["error"], "Product not found");
    assert_eq!(missing["errorKind"], "not_found");
    Ok(())
}

#[tokio::test]
async fn test_enrich_defaults_to_configured_manufacturer() -> anyhow::Result<()> {
    let body = multipart_body(Some(MIXED_CSV), None);
    let response =
        make_request(app(abdos_site()), Method::POST, "/api/v1/enrich", Some(body)).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await?;
    assert_eq!(json["manufacturer"], "Abdos");
    assert_eq!(json["stats"]["total"], 3);
    Ok(())
}

#[tokio::test]
async fn test_enrich_rejects_wrong_headers() -> anyhow::Result<()> {
    let body = multipart_body(Some("Company,Code,Name\nAbdos,P1,Tube\n"), Some("Abdos"));
    let response =
        make_request(app(abdos_site()), Method::POST, "/api/v1/enrich", Some(body)).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = json_body(response).await?;
    assert_eq!(json["success"], false);
    let details = json["details"].as_str().unwrap_or_default();
    assert!(details.contains("Company's Name"));
    assert!(details.contains("Cat. No"));
    assert!(details.contains("Product Name"));
    Ok(())
}

#[tokio::test]
async fn test_enrich_rejects_csv_without_valid_rows() -> anyhow::Result<()> {
    let csv = "Company's Name,Cat. No,Product Name\nAbdos,,\n";
    let body = multipart_body(Some(csv), Some("Abdos"));
    let response =
        make_request(app(abdos_site()), Method::POST, "/api/v1/enrich", Some(body)).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = json_body(response).await?;
    assert_eq!(json["error"], "No valid rows found in CSV");
    assert!(json["details"].as_str().unwrap_or_default().contains("Cat. No"));
    Ok(())
}

#[tokio::test]
async fn test_enrich_requires_file_field() -> anyhow::Result<()> {
    let body = multipart_body(None, Some("Abdos"));
    let response =
        make_request(app(abdos_site()), Method::POST, "/api/v1/enrich", Some(body)).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_metrics_route_absent_when_disabled() -> anyhow::Result<()> {
    let response = make_request(app(FakeSite::new()), Method::GET, "/metrics", None).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}
