// HTTP request handlers
use crate::domain::error::SettingsUpdateError;
use crate::domain::settings::Settings;
use crate::infrastructure::http_response::{failure, success, NetworkDataResponse};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct NetworkDataQuery {
    pub time_frame: Option<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/api/network_data", get(get_network_data))
        .route("/api/settings", get(get_settings).post(update_settings))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Sample series for a time frame (default: the configured one) plus medians
pub async fn get_network_data(
    Query(query): Query<NetworkDataQuery>,
    State(state): State<Arc<AppState>>,
) -> Json<NetworkDataResponse> {
    let settings = state.settings_service.get().await;
    let time_frame = query
        .time_frame
        .unwrap_or_else(|| settings.default_time_frame.clone());

    let view = state.query_service.get_series(&time_frame, &settings).await;
    Json(view.into())
}

pub async fn get_settings(State(state): State<Arc<AppState>>) -> Json<Settings> {
    Json(state.settings_service.get().await.as_ref().clone())
}

pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(document) = match body {
        Ok(body) => body,
        Err(rejection) => return failure(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    match state.settings_service.update(&document).await {
        Ok(_) => success("Settings saved successfully."),
        Err(SettingsUpdateError::Validation(e)) => failure(StatusCode::BAD_REQUEST, e.to_string()),
        Err(SettingsUpdateError::Storage(e)) => {
            tracing::error!("Failed to persist settings: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save settings.")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::query_service::MetricsQueryService;
    use crate::application::sample_repository::SampleRepository;
    use crate::application::settings_repository::SettingsRepository;
    use crate::application::settings_service::SettingsService;
    use crate::domain::sample::Sample;
    use crate::infrastructure::database::Database;
    use crate::infrastructure::sample_store::SqliteSampleRepository;
    use crate::infrastructure::settings_store::SqliteSettingsRepository;
    use axum::response::IntoResponse;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use tempfile::TempDir;

    struct Harness {
        _dir: TempDir,
        state: Arc<AppState>,
        samples: Arc<SqliteSampleRepository>,
        settings: Arc<SqliteSettingsRepository>,
    }

    async fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let database = Database::open(dir.path().join("network_tests.db")).await.unwrap();
        let samples = Arc::new(SqliteSampleRepository::new(database.clone()));
        let settings = Arc::new(SqliteSettingsRepository::new(database));

        let state = Arc::new(AppState {
            query_service: MetricsQueryService::new(samples.clone()),
            settings_service: Arc::new(SettingsService::load(settings.clone()).await.unwrap()),
        });

        Harness { _dir: dir, state, samples, settings }
    }

    async fn body_json(response: impl IntoResponse) -> (StatusCode, Value) {
        let response = response.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn seed(samples: &SqliteSampleRepository) {
        let now = Utc::now();
        for (age, download) in [(Duration::days(2), 10.0), (Duration::hours(2), 20.0), (Duration::minutes(10), 30.0)] {
            samples
                .append(&Sample {
                    timestamp: now - age,
                    download_mbps: Some(download),
                    upload_mbps: Some(5.0),
                    latency_ms: Some(12.0),
                })
                .await
                .unwrap();
        }
    }

    fn network_query(time_frame: Option<&str>) -> Query<NetworkDataQuery> {
        Query(NetworkDataQuery { time_frame: time_frame.map(str::to_string) })
    }

    #[tokio::test]
    async fn test_network_data_shape_and_filtering() {
        let h = harness().await;
        seed(&h.samples).await;

        let (status, body) =
            body_json(get_network_data(network_query(Some("1hour")), State(h.state.clone())).await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["time_series"].as_array().unwrap().len(), 1);
        assert_eq!(body["time_series"][0]["download_mbps"], json!(30.0));
        assert_eq!(body["medians"], json!({ "download": 30.0, "upload": 5.0, "ping": 12.0 }));

        let (_, all) = body_json(get_network_data(network_query(Some("all")), State(h.state.clone())).await).await;
        assert_eq!(all["time_series"].as_array().unwrap().len(), 3);
        assert_eq!(all["medians"]["download"], json!(20.0));

        let (_, unknown) =
            body_json(get_network_data(network_query(Some("decade")), State(h.state.clone())).await).await;
        assert_eq!(unknown, all);
    }

    #[tokio::test]
    async fn test_network_data_uses_default_time_frame() {
        let h = harness().await;
        seed(&h.samples).await;

        // Default is "1day", which drops the two-day-old sample.
        let (_, body) = body_json(get_network_data(network_query(None), State(h.state.clone())).await).await;
        assert_eq!(body["time_series"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_store_has_absent_medians() {
        let h = harness().await;

        let (_, body) = body_json(get_network_data(network_query(None), State(h.state.clone())).await).await;
        assert_eq!(body["time_series"], json!([]));
        assert_eq!(body["medians"], json!({ "download": null, "upload": null, "ping": null }));
    }

    #[tokio::test]
    async fn test_get_settings_returns_snapshot() {
        let h = harness().await;

        let (status, body) = body_json(get_settings(State(h.state.clone())).await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["port"], json!(5000));
        assert_eq!(body["default_time_frame"], json!("1day"));
        assert_eq!(body["time_frames"]["all"]["label"], json!("All Time"));
    }

    #[tokio::test]
    async fn test_update_settings_success_persists() {
        let h = harness().await;

        let payload = json!({ "test_interval_minutes": 15, "open_on_startup": false });
        let (status, body) = body_json(update_settings(State(h.state.clone()), Ok(Json(payload))).await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("success"));

        let stored = h.settings.load().await.unwrap();
        assert_eq!(stored.test_interval_minutes, 15);
        assert!(!stored.open_on_startup);
    }

    #[tokio::test]
    async fn test_update_settings_rejects_invalid_interval() {
        let h = harness().await;

        let payload = json!({ "port": 6001, "test_interval_minutes": -5 });
        let (status, body) = body_json(update_settings(State(h.state.clone()), Ok(Json(payload))).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], json!("error"));
        assert_eq!(body["message"], json!("test_interval_minutes must be a positive integer"));

        assert_eq!(h.settings.load().await.unwrap().port, 5000);
    }

    #[tokio::test]
    async fn test_removing_default_frame_is_reflected_after_reload() {
        let h = harness().await;

        let payload = json!({
            "time_frames": {
                "1week": { "label": "Last Week", "delta": { "weeks": 1 } }
            }
        });
        let (status, _) = body_json(update_settings(State(h.state.clone()), Ok(Json(payload))).await).await;
        assert_eq!(status, StatusCode::OK);

        let reloaded = h.settings.load().await.unwrap();
        assert_eq!(reloaded.default_time_frame, "1week");
        assert!(reloaded.time_frames.contains_key("all"));
    }
}
