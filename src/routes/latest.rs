use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use tracing::{debug, info};

use super::{ApiError, AppState};
use crate::enricher::todays_stats;
use crate::{EnrichedReading, Layer, WeatherError};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/latest", get(handler))
}

/// Newest silver reading with today's daily stats recomputed from bronze.
///
/// Uses the collector feed when one has been published, else scans the store.
async fn handler(State(state): State<AppState>) -> Result<Json<EnrichedReading>, ApiError> {
    // ---
    info!("GET /latest");
    let now = Utc::now();

    let cached = state.latest.as_ref().and_then(|rx| rx.borrow().clone());
    let reading = match cached {
        Some(reading) => Some(reading),
        None => {
            debug!("GET /latest - no collector feed, scanning store");
            state.store.get_latest(Layer::Silver, now).await?
        }
    };

    let mut reading =
        reading.ok_or_else(|| WeatherError::NotFound("no readings available".into()))?;

    if reading.raw.timestamp.date_naive() == now.date_naive() {
        reading.daily = todays_stats(&state.store, &reading.raw, now).await;
    }
    Ok(Json(reading))
}
