use axum::{extract::Query, extract::State, routing::get, Json, Router};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ApiError, AppState};
use crate::{EnrichedReading, Layer, WeatherError};

// ---

const DEFAULT_HOURS: i64 = 24;
const MAX_HOURS: i64 = 168;

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/history", get(handler))
}

/// Query parameters for `GET /history`
#[derive(Debug, Deserialize)]
struct HistoryQuery {
    hours: Option<i64>,
}

#[derive(Debug, Serialize)]
struct HistoryResponse {
    hours: i64,
    count: usize,
    readings: Vec<EnrichedReading>,
}

async fn handler(
    Query(params): Query<HistoryQuery>,
    State(state): State<AppState>,
) -> Result<Json<HistoryResponse>, ApiError> {
    // ---
    let hours = params.hours.unwrap_or(DEFAULT_HOURS);
    if !(1..=MAX_HOURS).contains(&hours) {
        return Err(WeatherError::Validation(format!(
            "hours must be between 1 and {MAX_HOURS}, got {hours}"
        ))
        .into());
    }

    let now = Utc::now();
    let readings: Vec<EnrichedReading> = state
        .store
        .list_window(Layer::Silver, now - Duration::hours(hours), now)
        .await?;

    info!("GET /history - {} readings in last {}h", readings.len(), hours);
    Ok(Json(HistoryResponse {
        hours,
        count: readings.len(),
        readings,
    }))
}
