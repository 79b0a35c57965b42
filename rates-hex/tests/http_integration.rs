//! HTTP-level tests for the management API.
//!
//! The router is driven with `oneshot` over in-memory adapters and the fixed
//! provider. Management triggers answer 202 and run in the background, so the
//! tests poll the trail endpoint for the outcome.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use rates_hex::{
    EventPublisher, HistoricalSyncService, LatestRateService, ProviderRegistry, RatesSettings,
    TrailService, inbound::HttpServer,
};
use rates_providers::FixedRateProvider;
use rates_repo::{InMemoryRateCache, InMemoryTrailRepository};
use rates_types::{CurrencyCode, CurrencyRateProvider};
use tower::ServiceExt;

/// Helper to create a router over fresh in-memory stores.
fn create_test_app() -> Router {
    let settings = RatesSettings::default()
        .with_tracked_currencies(vec![CurrencyCode::EUR, CurrencyCode::GBP])
        .with_history_window_days(3);

    let cache = Arc::new(InMemoryRateCache::new());
    let trail_repo = Arc::new(InMemoryTrailRepository::new());
    let provider: Arc<dyn CurrencyRateProvider> =
        Arc::new(FixedRateProvider::new("fixed", CurrencyCode::USD));
    let registry = Arc::new(ProviderRegistry::new(vec![provider], &settings).unwrap());
    let trails = TrailService::new(trail_repo);

    let latest = Arc::new(LatestRateService::new(
        cache.clone(),
        registry.clone(),
        trails.clone(),
        EventPublisher::default(),
        &settings,
    ));
    let history = Arc::new(HistoricalSyncService::new(
        cache,
        registry,
        trails.clone(),
        &settings,
    ));

    HttpServer::new(latest, history, trails).router()
}

fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

/// Polls a trail listing until it reports `expected` records.
async fn wait_for_trails(app: &Router, uri: &str, expected: u64) -> serde_json::Value {
    for _ in 0..100 {
        let (status, json) = send(app, request(Method::GET, uri)).await;
        assert_eq!(status, StatusCode::OK);
        if json["total"].as_u64() == Some(expected) {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("{} never reached {} trail records", uri, expected);
}

#[tokio::test]
async fn test_health() {
    let app = create_test_app();
    let (status, json) = send(&app, request(Method::GET, "/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_refresh_is_accepted_and_recorded() {
    let app = create_test_app();

    let response = app
        .clone()
        .oneshot(request(Method::POST, "/api/exchange-rates/refresh"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(body.is_empty());

    let trails = wait_for_trails(&app, "/api/trails?operation=LATEST_SYNCHRONIZATION", 1).await;
    let record = &trails["items"][0];
    assert_eq!(record["state"], "SUCCESS");
    assert_eq!(record["evaluated"], 2);
    assert_eq!(record["skipped"], 0);

    let (status, latest) = send(&app, request(Method::GET, "/api/exchange-rates/latest")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest.as_array().unwrap().len(), 2);

    let (status, filtered) = send(
        &app,
        request(Method::GET, "/api/exchange-rates/latest?currencies=GBP,XYZ"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(filtered.as_array().unwrap().len(), 1);
    assert_eq!(filtered[0]["currency"], "GBP");

    let (status, eur) = send(&app, request(Method::GET, "/api/exchange-rates/latest/eur")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(eur["is_latest"], true);
    assert_eq!(eur["to"]["currency"], "USD");
}

#[tokio::test]
async fn test_history_update_is_accepted_and_recorded() {
    let app = create_test_app();

    let (status, _) = send(
        &app,
        request(Method::POST, "/api/exchange-rates/history-update"),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let trails = wait_for_trails(&app, "/api/trails?operation=HISTORICAL_UPDATE", 1).await;
    let record = &trails["items"][0];
    // Two currencies over a four-day window.
    assert_eq!(record["evaluated"], 8);
    assert_eq!(record["affected_ids"].as_array().unwrap().len(), 8);

    // History never sets the latest pointer.
    let (_, latest) = send(&app, request(Method::GET, "/api/exchange-rates/latest")).await;
    assert!(latest.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_latest_lookup_errors() {
    let app = create_test_app();

    let (status, json) =
        send(&app, request(Method::GET, "/api/exchange-rates/latest/XYZ")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], 400);

    let (status, _) = send(&app, request(Method::GET, "/api/exchange-rates/latest/JPY")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_or_update_and_purge() {
    let app = create_test_app();

    let body = r#"{
        "currency": "CHF",
        "date": "2024-01-10",
        "rate": 0.88,
        "details": { "FIXED": { "provider": "FIXED", "base": "USD" } }
    }"#;
    let req = Request::builder()
        .method(Method::PUT)
        .uri("/api/exchange-rates")
        .header("Content-Type", "application/json")
        .body(Body::from(body))
        .unwrap();
    let (status, entry) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry["currency"], "CHF");
    assert_eq!(entry["is_latest"], true);

    let invalid = Request::builder()
        .method(Method::PUT)
        .uri("/api/exchange-rates")
        .header("Content-Type", "application/json")
        .body(Body::from(
            r#"{"currency":"CHF","date":"2024-01-11","rate":-1.0,"details":{"FIXED":{"provider":"FIXED","base":"USD"}}}"#,
        ))
        .unwrap();
    let (status, _) = send(&app, invalid).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let trails = wait_for_trails(&app, "/api/trails?operation=CREATE_OR_UPDATE", 2).await;
    let states: Vec<_> = trails["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["state"].as_str().unwrap().to_string())
        .collect();
    assert!(states.contains(&"SUCCESS".to_string()));
    assert!(states.contains(&"ERROR".to_string()));

    let (status, purged) = send(&app, request(Method::DELETE, "/api/exchange-rates")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(purged["deleted"], 1);
}

#[tokio::test]
async fn test_create_or_update_without_details_is_rejected() {
    let app = create_test_app();

    let req = Request::builder()
        .method(Method::PUT)
        .uri("/api/exchange-rates")
        .header("Content-Type", "application/json")
        .body(Body::from(r#"{"currency":"CHF","date":"2024-01-10","rate":0.88}"#))
        .unwrap();
    let (status, json) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("FIXED"));

    let trails = wait_for_trails(&app, "/api/trails?operation=CREATE_OR_UPDATE", 1).await;
    let record = &trails["items"][0];
    assert_eq!(record["state"], "ERROR");
    assert_eq!(record["skipped"], 1);
    assert_eq!(record["failures"][0]["currency"], "CHF");
    assert_eq!(record["failures"][0]["kind"], "VALIDATION");

    let (status, _) = send(&app, request(Method::GET, "/api/exchange-rates/latest/CHF")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_trail_lookup() {
    let app = create_test_app();

    let (status, _) = send(&app, request(Method::GET, "/api/trails/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, request(Method::GET, "/api/trails?date=yesterday")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    send(&app, request(Method::POST, "/api/exchange-rates/refresh")).await;
    let trails = wait_for_trails(&app, "/api/trails", 1).await;
    let id = trails["items"][0]["id"].as_str().unwrap().to_string();

    let (status, record) = send(&app, request(Method::GET, &format!("/api/trails/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["id"], id.as_str());

    let (status, _) = send(
        &app,
        request(
            Method::GET,
            "/api/trails/00000000-0000-0000-0000-000000000000",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
