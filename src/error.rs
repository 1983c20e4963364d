//! Error taxonomy shared by the metrics, store, enrichment and backfill layers.
//!
//! Binaries wrap these in `anyhow` at the top level; library code returns
//! [`WeatherResult`] so callers can tell an absorbed per-object failure apart
//! from a store outage.

use thiserror::Error;

// ---

#[derive(Debug, Error)]
pub enum WeatherError {
    // ---
    /// A calculation was handed arguments outside its domain.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A stored object could not be decoded into a reading.
    #[error("malformed record at {key}: {reason}")]
    MalformedRecord { key: String, reason: String },

    /// Listing, reading or writing failed at the transport level.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("object not found: {0}")]
    NotFound(String),

    /// User supplied argument out of range.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("sensor read failed: {0}")]
    Sensor(String),
}

pub type WeatherResult<T> = Result<T, WeatherError>;

impl From<std::io::Error> for WeatherError {
    fn from(e: std::io::Error) -> Self {
        // ---
        match e.kind() {
            std::io::ErrorKind::NotFound => WeatherError::NotFound(e.to_string()),
            _ => WeatherError::StoreUnavailable(e.to_string()),
        }
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(e: reqwest::Error) -> Self {
        WeatherError::Sensor(e.to_string())
    }
}
