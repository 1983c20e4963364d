use axum::{extract::Query, extract::State, routing::get, Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState};
use crate::Layer;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/dates", get(handler))
}

#[derive(Debug, Deserialize)]
struct DatesQuery {
    layer: Option<Layer>,
}

#[derive(Debug, Serialize)]
struct DatesResponse {
    layer: Layer,
    dates: Vec<NaiveDate>,
}

/// Date partitions present in a layer (silver unless `?layer=bronze`).
async fn handler(
    Query(params): Query<DatesQuery>,
    State(state): State<AppState>,
) -> Result<Json<DatesResponse>, ApiError> {
    // ---
    let layer = params.layer.unwrap_or(Layer::Silver);
    let dates = state.store.list_dates(layer).await?;
    Ok(Json(DatesResponse { layer, dates }))
}
