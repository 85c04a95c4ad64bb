//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::AppState;
use super::types::{ErrorResponse, StateResponse, TelemetryQuery, TelemetryRecord};
use crate::runner::VillageSummary;

/// Returns every village's customers, population and subscriptions.
///
/// `GET /villages` → 200 + `Vec<VillageSummary>` JSON
pub async fn get_villages(State(state): State<Arc<AppState>>) -> Json<Vec<VillageSummary>> {
    Json(state.villages.clone())
}

/// Returns run config, run report, and the records of the last timeslot.
///
/// `GET /state` → 200 + `StateResponse` JSON
pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<StateResponse> {
    let latest = state.steps.last().map_or_else(Vec::new, |last| {
        state
            .steps
            .iter()
            .filter(|s| s.timeslot == last.timeslot)
            .map(TelemetryRecord::from)
            .collect()
    });

    Json(StateResponse {
        config: state.config.clone(),
        report: state.report.clone(),
        latest,
    })
}

/// Returns telemetry records, optionally filtered by timeslot range.
///
/// `GET /telemetry` → 200 + `Vec<TelemetryRecord>` JSON
/// `GET /telemetry?from=N&to=M` → filtered range (inclusive)
/// `GET /telemetry?from=10&to=5` → 400 + `ErrorResponse`
pub async fn get_telemetry(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TelemetryQuery>,
) -> impl IntoResponse {
    let from = query.from.unwrap_or(0);
    let to = query.to.unwrap_or(usize::MAX);

    if from > to {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("`from` ({from}) must be <= `to` ({to})"),
            }),
        ));
    }

    let records: Vec<TelemetryRecord> = state
        .steps
        .iter()
        .filter(|s| s.timeslot >= from && s.timeslot <= to)
        .map(TelemetryRecord::from)
        .collect();

    Ok(Json(records))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    use super::*;
    use crate::api::router;
    use crate::config::ScenarioConfig;
    use crate::runner::run_scenario;
    use crate::village::GroupSizes;

    fn make_test_state() -> Arc<AppState> {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.days_of_bootstrap = 0;
        cfg.simulation.days_of_competition = 1;
        cfg.simulation.villages = 1;
        cfg.village = GroupSizes {
            ns: 1,
            ras: 0,
            res: 0,
            ss: 1,
        };
        let result = run_scenario(&cfg).unwrap();
        Arc::new(AppState::from(result))
    }

    async fn get_json(state: Arc<AppState>, uri: &str) -> (StatusCode, serde_json::Value) {
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
    async fn state_returns_200() {
        let (status, json) = get_json(make_test_state(), "/state").await;
        assert_eq!(status, StatusCode::OK);
        assert!(json.get("config").is_some());
        assert!(json.get("report").is_some());
        assert_eq!(json["latest"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn telemetry_range_query() {
        let (status, json) = get_json(make_test_state(), "/telemetry?from=5&to=10").await;
        assert_eq!(status, StatusCode::OK);
        let rows = json.as_array().unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0]["timeslot"], 5);
        assert_eq!(rows[5]["timeslot"], 10);
    }

    #[tokio::test]
    async fn telemetry_invalid_range_returns_400() {
        let (status, json) = get_json(make_test_state(), "/telemetry?from=10&to=5").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json.get("error").is_some());
    }

    #[tokio::test]
    async fn villages_lists_customers() {
        let (status, json) = get_json(make_test_state(), "/villages").await;
        assert_eq!(status, StatusCode::OK);
        let villages = json.as_array().unwrap();
        assert_eq!(villages.len(), 1);
        assert_eq!(villages[0]["population"], 2);
        assert_eq!(villages[0]["customers"].as_array().map(Vec::len), Some(2));
    }
}
