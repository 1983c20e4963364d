use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use tracing::info;

use super::{ApiError, AppState};
use crate::enricher::enrich_fresh;
use crate::sensor::read_measurement;
use crate::EnrichedReading;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/current", get(handler))
}

/// Read the sensor now and enrich the sample without persisting it.
async fn handler(State(state): State<AppState>) -> Result<Json<EnrichedReading>, ApiError> {
    // ---
    info!("GET /current - sampling {}", state.sensor.name());
    let now = Utc::now();

    let sample = state.sensor.sample().await?;
    let raw = read_measurement(&sample, state.calibration_offset_c, now);
    let enriched = enrich_fresh(&state.store, &raw, now).await;

    Ok(Json(enriched))
}
