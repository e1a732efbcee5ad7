// HTTP response bodies for the dashboard API
use crate::application::query_service::SeriesView;
use crate::domain::sample::{Medians, Sample};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct NetworkDataResponse {
    pub time_series: Vec<Sample>,
    pub medians: MediansBody,
}

/// The dashboard calls latency "ping".
#[derive(Debug, Serialize, PartialEq)]
pub struct MediansBody {
    pub download: Option<f64>,
    pub upload: Option<f64>,
    pub ping: Option<f64>,
}

impl From<Medians> for MediansBody {
    fn from(medians: Medians) -> Self {
        Self {
            download: medians.download,
            upload: medians.upload,
            ping: medians.latency,
        }
    }
}

impl From<SeriesView> for NetworkDataResponse {
    fn from(view: SeriesView) -> Self {
        Self {
            time_series: view.series,
            medians: view.medians.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Acknowledgement {
    pub status: &'static str,
    pub message: String,
}

pub fn success(message: impl Into<String>) -> Response {
    (StatusCode::OK, Json(Acknowledgement { status: "success", message: message.into() })).into_response()
}

pub fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(Acknowledgement { status: "error", message: message.into() })).into_response()
}
