use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use salesdash_core::row::{Month, Row};
use salesdash_server::app::build_app;
use salesdash_server::config::Config;
use salesdash_server::state::AppState;
use salesdash_source::MemorySource;

fn sale(year: i32, month: Month, ba: &str, brand: &str, gsales: f64, fgp: f64) -> Row {
    let mut row = Row::new(year, month);
    row.business_area = ba.to_string();
    row.brand = brand.to_string();
    row.channel = "Retail".to_string();
    row.customer = format!("{brand} Stores");
    row.cases = 10.0;
    row.gross_sales = gsales;
    row.fgp = fgp;
    row.group_cost = gsales * 0.6;
    row
}

fn sample_rows() -> Vec<Row> {
    vec![
        sale(2024, Month::Jan, "Grocery ROI", "Acme", 1000.0, 200.0),
        sale(2024, Month::Feb, "Grocery ROI", "Acme", 1500.0, 225.0),
        sale(2024, Month::Feb, "Wholesale ROI", "Bolt", 4000.0, 200.0),
        sale(2024, Month::Mar, "Export", "Cove", 600.0, 150.0),
        sale(2023, Month::Jan, "Grocery ROI", "Acme", 900.0, 180.0),
        sale(2023, Month::Feb, "Wholesale ROI", "Bolt", 3000.0, 450.0),
    ]
}

fn setup_with(rows: Vec<Row>, config: Config) -> (Arc<MemorySource>, axum::Router) {
    let source = Arc::new(MemorySource::new(rows));
    let state = Arc::new(AppState::new(config, source.clone()));
    (source, build_app(state))
}

fn setup() -> axum::Router {
    setup_with(sample_rows(), Config::default()).1
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let response = app.oneshot(request).await.expect("request");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    let body = serde_json::from_slice(&bytes).expect("parse JSON");
    (status, headers, body)
}

#[tokio::test]
async fn test_aggregates_for_a_year() {
    let (status, headers, body) = get(setup(), "/api/analytics/aggregates?year=2024").await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["total_revenue"], 7100.0);
    assert_eq!(data["total_margin"], 775.0);
    assert_eq!(data["record_count"], 4);
    assert_eq!(headers["x-data-source"], "primary");
    assert_eq!(headers["x-data-row-count"], "6");
    assert!(headers.contains_key("x-data-last-updated"));
}

#[tokio::test]
async fn test_all_sentinel_matches_absent_filter() {
    let app = setup();
    let (_, _, all) = get(app.clone(), "/api/analytics/aggregates?businessArea=All&year=All").await;
    let (_, _, none) = get(app, "/api/analytics/aggregates").await;
    assert_eq!(all["data"], none["data"]);
}

#[tokio::test]
async fn test_repeat_request_is_served_from_cache() {
    let app = setup();
    let (_, first, _) = get(app.clone(), "/api/analytics/trends?year=2024").await;
    let (_, second, body) = get(app, "/api/analytics/trends?year=2024").await;
    assert_eq!(first["x-data-source"], "primary");
    assert_eq!(second["x-data-source"], "cache");
    let labels: Vec<&str> = body["data"]
        .as_array()
        .expect("trend array")
        .iter()
        .map(|p| p["period"].as_str().expect("period"))
        .collect();
    assert_eq!(labels, vec!["Jan", "Feb", "Mar"]);
}

#[tokio::test]
async fn test_top_performers_offset_is_page_index() {
    let (status, _, body) = get(
        setup(),
        "/api/analytics/top-performers?dimension=brand&metric=revenue&limit=1&offset=1",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().expect("data array");
    assert_eq!(data.len(), 1);
    // Bolt 7000, Acme 3400, Cove 600: page 2 of size 1 is Acme.
    assert_eq!(data[0]["name"], "Acme");
    assert_eq!(body["pagination"]["current_page"], 2);
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["has_more"], true);
}

#[tokio::test]
async fn test_unknown_dimension_groups_under_empty_name() {
    let (status, _, body) = get(setup(), "/api/analytics/top-performers?dimension=planet").await;
    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().expect("data array");
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["name"], "");
}

#[tokio::test]
async fn test_risk_levels() {
    let (status, _, body) = get(setup(), "/api/analytics/risk?dimension=brand&year=2024").await;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"].as_array().expect("data array");
    let bolt = items
        .iter()
        .find(|i| i["name"] == "Bolt")
        .expect("Bolt present");
    // 200 / 4000 = 5% margin.
    assert_eq!(bolt["risk_level"], "high");
    assert_eq!(bolt["reason"], "Low margin");
}

#[tokio::test]
async fn test_variance_uses_previous_year() {
    let (status, _, body) = get(setup(), "/api/analytics/variance?year=2024").await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["comparison"], "previous-period");
    for field in [
        "total_variance",
        "volume_variance",
        "price_variance",
        "cost_variance",
        "mix_variance",
    ] {
        let v = data[field].as_f64().expect("number");
        assert!((-50.0..=50.0).contains(&v), "{field} out of range: {v}");
    }
}

#[tokio::test]
async fn test_data_endpoint_paginates_rows() {
    let (status, _, body) = get(setup(), "/api/analytics/data?period=YTD&limit=2&offset=0").await;
    assert_eq!(status, StatusCode::OK);
    // YTD anchors on the latest year (2024) through its latest month (Mar).
    assert_eq!(body["pagination"]["total"], 4);
    assert_eq!(body["data"].as_array().expect("rows").len(), 2);
    assert_eq!(body["data"][0]["year"], 2024);
}

#[tokio::test]
async fn test_performance_by_business_area() {
    let (status, _, body) = get(
        setup(),
        "/api/analytics/performance/business-area?year=2024",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().expect("rows");
    assert_eq!(rows[0]["name"], "Wholesale ROI");
    assert_eq!(rows.len(), 3);
}

#[tokio::test]
async fn test_overview_and_filter_options() {
    let app = setup();
    let (status, _, body) = get(app.clone(), "/api/dashboard/overview?year=2023").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["aggregates"]["total_revenue"], 3900.0);
    assert_eq!(
        body["data"]["revenue_trend"].as_array().expect("trend").len(),
        2
    );

    let (status, _, body) = get(app, "/api/filters/options").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["years"], serde_json::json!([2024, 2023]));
    assert_eq!(
        body["data"]["brands"],
        serde_json::json!(["Acme", "Bolt", "Cove"])
    );
}

#[tokio::test]
async fn test_invalid_limit_is_rejected() {
    let (status, _, body) = get(setup(), "/api/analytics/risk?limit=lots").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
    assert_eq!(body["error"]["field"], "limit");
}

#[tokio::test]
async fn test_out_of_range_year_is_rejected() {
    let (status, _, body) =
        get(setup(), "/api/reports/business-area?year=-2147483648").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "year");
}

#[tokio::test]
async fn test_largest_page_index_returns_empty_page() {
    let (status, _, body) = get(
        setup(),
        "/api/analytics/top-performers?offset=18446744073709551615",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));
    assert_eq!(body["pagination"]["has_more"], false);
    assert_eq!(body["pagination"]["current_page"], u64::MAX);
}

#[tokio::test]
async fn test_outage_serves_zeroed_result_by_default() {
    let (source, app) = setup_with(sample_rows(), Config::default());
    source.set_offline(true);
    let (status, headers, body) = get(app, "/api/analytics/aggregates").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_revenue"], 0.0);
    assert_eq!(headers["x-data-row-count"], "0");
}

#[tokio::test]
async fn test_outage_is_503_when_empty_fallback_disabled() {
    let config = Config {
        allow_empty_on_failure: false,
        ..Config::default()
    };
    let (source, app) = setup_with(sample_rows(), config);
    source.set_offline(true);
    let (status, _, body) = get(app, "/api/analytics/aggregates").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "data_source_unavailable");
}
