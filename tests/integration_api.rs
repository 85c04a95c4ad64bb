//! Integration tests for the REST API feature.

#![cfg(feature = "api")]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::util::ServiceExt;

use household_sim::api::{AppState, router};
use household_sim::config::ScenarioConfig;
use household_sim::runner::run_scenario;
use household_sim::village::GroupSizes;

/// Runs a two-village, one-day scenario and returns the API state.
fn build_api_state() -> Arc<AppState> {
    let mut cfg = ScenarioConfig::baseline();
    cfg.simulation.days_of_bootstrap = 0;
    cfg.simulation.days_of_competition = 1;
    cfg.village = GroupSizes {
        ns: 1,
        ras: 1,
        res: 1,
        ss: 1,
    };
    let result = run_scenario(&cfg).unwrap();
    Arc::new(AppState::from(result))
}

async fn get(state: Arc<AppState>, uri: &str) -> (StatusCode, serde_json::Value) {
    let app = router(state);
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn telemetry_covers_every_village_and_timeslot() {
    let (status, json) = get(build_api_state(), "/telemetry").await;
    assert_eq!(status, StatusCode::OK);
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 24 * 2);
    for key in [
        "timeslot",
        "at",
        "village",
        "day",
        "quarter",
        "temperature",
        "base_kwh",
        "controllable_kwh",
        "charge",
        "failures",
    ] {
        assert!(rows[0].get(key).is_some(), "missing key {key}");
    }
}

#[tokio::test]
async fn state_reports_latest_timeslot_for_each_village() {
    let (status, json) = get(build_api_state(), "/state").await;
    assert_eq!(status, StatusCode::OK);
    let latest = json["latest"].as_array().unwrap();
    assert_eq!(latest.len(), 2);
    assert!(latest.iter().all(|r| r["timeslot"] == 23));
    assert_eq!(json["config"]["seed"], 42);
    assert!(json["report"]["base_kwh"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn villages_expose_subscriptions() {
    let (status, json) = get(build_api_state(), "/villages").await;
    assert_eq!(status, StatusCode::OK);
    let villages = json.as_array().unwrap();
    assert_eq!(villages.len(), 2);
    assert_eq!(villages[0]["name"], "Village 1");
    assert_eq!(villages[0]["population"], 4);
    let subscriptions = villages[0]["subscriptions"].as_array().unwrap();
    // one default tariff per group and power type
    assert_eq!(subscriptions.len(), 8);
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = router(build_api_state());
    let req = Request::builder().uri("/households").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
