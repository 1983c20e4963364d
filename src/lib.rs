//! Weather station pipeline.
//!
//! Samples temperature, humidity and pressure, derives secondary metrics (dew
//! point, comfort, pressure trend, daily aggregates) and persists raw (bronze)
//! and enriched (silver) readings to a date-partitioned blob store. The same
//! derivation drives the live collector, the HTTP query service and the
//! backfill job.
//!
//! This crate follows the Explicit Module Boundary Pattern (EMBP): binaries and
//! sibling modules reach each other only through the re-exports below.

use std::sync::Arc;

mod config;
mod error;
mod logging;
mod models;

pub mod backfill;
pub mod collector;
pub mod enricher;
pub mod metrics;
pub mod routes;
pub mod sensor;
pub mod store;

pub use config::{load_from_env, Config};
pub use error::{WeatherError, WeatherResult};
pub use logging::init_tracing;
pub use models::{
    ts_format, ComfortIndex, DailyStats, EnrichedReading, PressureTrend, PressureTrendLabel,
    RawReading, SensorSample, Timestamped,
};
pub use sensor::{HttpSensorSource, SensorSource, SyntheticSensor};
pub use store::{Layer, LocalBlobStore, ReadingStore};

// ---

/// Reading store over the filesystem bucket named by `cfg`.
pub fn open_store(cfg: &Config) -> ReadingStore {
    // ---
    let blobs = Arc::new(LocalBlobStore::new(cfg.data_dir.clone()));
    ReadingStore::new(blobs, cfg.bronze_prefix.clone(), cfg.silver_prefix.clone())
        .with_latest_scan_limit(cfg.latest_scan_limit)
}

/// HTTP sensor when `SENSOR_API_URL` is set, otherwise the synthetic one.
pub fn open_sensor(cfg: &Config) -> Arc<dyn SensorSource> {
    // ---
    match &cfg.sensor_api_url {
        Some(url) => Arc::new(HttpSensorSource::new(url.clone())),
        None => {
            tracing::warn!("SENSOR_API_URL not set, using synthetic sensor");
            Arc::new(SyntheticSensor::default())
        }
    }
}
