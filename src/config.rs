//! Configuration loader for the `weatherflow` binaries.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.
//!
use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Result};

/// Parse an optional numeric environment variable with a default value.
macro_rules! parse_env {
    ($var_name:expr, $ty:ty, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Read an optional string environment variable with a default value.
macro_rules! env_or {
    ($var_name:expr, $default:expr) => {
        env::var($var_name).unwrap_or_else(|_| $default.to_string())
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Root directory of the filesystem bucket.
    pub data_dir: PathBuf,

    /// Key prefix of the raw (bronze) layer.
    pub bronze_prefix: String,

    /// Key prefix of the enriched (silver) layer.
    pub silver_prefix: String,

    /// Seconds between collector samples.
    pub sample_interval_sec: u64,

    /// Degrees subtracted from the sensor temperature to undo CPU heating.
    pub temp_calibration_offset_c: f64,

    /// Sensor endpoint; `None` selects the synthetic sensor.
    pub sensor_api_url: Option<String>,

    /// Hours between live pressure-trend recalculations.
    pub trend_recalc_hours: i64,

    /// Objects fetched when looking up the latest reading.
    pub latest_scan_limit: usize,

    /// Run the collector loop inside the API service.
    pub collector_enabled: bool,

    /// API listen port.
    pub api_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from("./data"),
            bronze_prefix: "samples".into(),
            silver_prefix: "silver".into(),
            sample_interval_sec: 900,
            temp_calibration_offset_c: 0.0,
            sensor_api_url: None,
            trend_recalc_hours: 6,
            latest_scan_limit: 10,
            collector_enabled: true,
            api_port: 8000,
        }
    }
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `WEATHER_DATA_DIR` – bucket root directory (default: `./data`)
/// - `WEATHER_BRONZE_PREFIX` – raw layer prefix (default: `samples`)
/// - `WEATHER_SILVER_PREFIX` – enriched layer prefix (default: `silver`)
/// - `SAMPLE_INTERVAL_SEC` – collector interval (default: 900)
/// - `TEMP_CALIBRATION_OFFSET_C` – temperature offset (default: 0.0)
/// - `SENSOR_API_URL` – sensor endpoint (default: synthetic sensor)
/// - `TREND_RECALC_HOURS` – trend throttle (default: 6)
/// - `LATEST_SCAN_LIMIT` – latest lookup fetch limit (default: 10)
/// - `COLLECTOR_ENABLED` – run collector in the API (default: true)
/// - `API_PORT` – listen port (default: 8000)
///
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let defaults = Config::default();

    let data_dir = env::var("WEATHER_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or(defaults.data_dir);
    let bronze_prefix = env_or!("WEATHER_BRONZE_PREFIX", defaults.bronze_prefix);
    let silver_prefix = env_or!("WEATHER_SILVER_PREFIX", defaults.silver_prefix);
    let sample_interval_sec = parse_env!("SAMPLE_INTERVAL_SEC", u64, defaults.sample_interval_sec);
    let temp_calibration_offset_c = parse_env!(
        "TEMP_CALIBRATION_OFFSET_C",
        f64,
        defaults.temp_calibration_offset_c
    );
    let sensor_api_url = env::var("SENSOR_API_URL").ok().filter(|u| !u.trim().is_empty());
    let trend_recalc_hours = parse_env!("TREND_RECALC_HOURS", i64, defaults.trend_recalc_hours);
    let latest_scan_limit = parse_env!("LATEST_SCAN_LIMIT", usize, defaults.latest_scan_limit);
    let collector_enabled = parse_flag(
        "COLLECTOR_ENABLED",
        env::var("COLLECTOR_ENABLED").ok().as_deref(),
        defaults.collector_enabled,
    )?;
    let api_port = parse_env!("API_PORT", u16, defaults.api_port);

    if sample_interval_sec == 0 {
        return Err(anyhow!("SAMPLE_INTERVAL_SEC must be greater than zero"));
    }
    if trend_recalc_hours < 0 {
        return Err(anyhow!("TREND_RECALC_HOURS must not be negative"));
    }

    Ok(Config {
        data_dir,
        bronze_prefix,
        silver_prefix,
        sample_interval_sec,
        temp_calibration_offset_c,
        sensor_api_url,
        trend_recalc_hours,
        latest_scan_limit,
        collector_enabled,
        api_port,
    })
}

fn parse_flag(name: &str, value: Option<&str>, default: bool) -> Result<bool> {
    // ---
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") => Ok(default),
        Some("1") | Some("true") | Some("yes") => Ok(true),
        Some("0") | Some("false") | Some("no") => Ok(false),
        Some(other) => Err(anyhow!("Invalid {}: {}", name, other)),
    }
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  WEATHER_DATA_DIR          : {}", self.data_dir.display());
        tracing::info!("  WEATHER_BRONZE_PREFIX     : {}", self.bronze_prefix);
        tracing::info!("  WEATHER_SILVER_PREFIX     : {}", self.silver_prefix);
        tracing::info!("  SAMPLE_INTERVAL_SEC       : {}", self.sample_interval_sec);
        tracing::info!("  TEMP_CALIBRATION_OFFSET_C : {}", self.temp_calibration_offset_c);
        tracing::info!(
            "  SENSOR_API_URL            : {}",
            self.sensor_api_url.as_deref().unwrap_or("(synthetic)")
        );
        tracing::info!("  TREND_RECALC_HOURS        : {}", self.trend_recalc_hours);
        tracing::info!("  LATEST_SCAN_LIMIT         : {}", self.latest_scan_limit);
        tracing::info!("  COLLECTOR_ENABLED         : {}", self.collector_enabled);
        tracing::info!("  API_PORT                  : {}", self.api_port);
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_parse_flag() {
        // ---
        assert!(parse_flag("X", None, true).unwrap());
        assert!(!parse_flag("X", Some("false"), true).unwrap());
        assert!(parse_flag("X", Some(" YES "), false).unwrap());
        assert!(parse_flag("X", Some("maybe"), false).is_err());
    }

    #[test]
    fn test_defaults_match_station_deployment() {
        // ---
        let cfg = Config::default();
        assert_eq!(cfg.sample_interval_sec, 900);
        assert_eq!(cfg.bronze_prefix, "samples");
        assert_eq!(cfg.silver_prefix, "silver");
        assert_eq!(cfg.trend_recalc_hours, 6);
    }
}
