//! HTTP query surface.
//!
//! Gateway for the per-endpoint sub-routers (EMBP). Each sibling module
//! exports a `router()` over the shared [`AppState`]; this module merges them
//! and attaches state and CORS so `main.rs` only sees [`router`].

use std::sync::Arc;

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::collector::LatestReading;
use crate::{ReadingStore, SensorSource, WeatherError};

mod current;
mod dates;
mod health;
mod history;
mod latest;

// ---

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: ReadingStore,
    pub sensor: Arc<dyn SensorSource>,
    /// Feed from the in-process collector, when one is running.
    pub latest: Option<LatestReading>,
    pub calibration_offset_c: f64,
}

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(latest::router())
        .merge(current::router())
        .merge(history::router())
        .merge(dates::router())
        .merge(health::router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// [`WeatherError`] rendered as `{"error": "..."}` with a matching status.
#[derive(Debug)]
pub struct ApiError(WeatherError);

impl From<WeatherError> for ApiError {
    fn from(e: WeatherError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // ---
        let status = match &self.0 {
            WeatherError::Validation(_) | WeatherError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            WeatherError::NotFound(_) => StatusCode::NOT_FOUND,
            WeatherError::StoreUnavailable(_) | WeatherError::Sensor(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            WeatherError::MalformedRecord { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
