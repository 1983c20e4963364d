//! Sensor acquisition.
//!
//! [`SensorSource`] yields one instantaneous sample per call. Two sources ship
//! with the service:
//! - [`HttpSensorSource`]: polls a JSON endpoint exposed by the station board
//! - [`SyntheticSensor`]: deterministic day/night pattern for development

use std::f64::consts::PI;

use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};

use crate::error::{WeatherError, WeatherResult};
use crate::metrics::round_to;
use crate::models::{RawReading, SensorSample};

// ---

#[async_trait]
pub trait SensorSource: Send + Sync {
    // ---
    async fn sample(&self) -> WeatherResult<SensorSample>;

    /// Short label for logs.
    fn name(&self) -> &str;
}

/// Fetches `{temperature_c, humidity_pct, pressure_hpa, ...}` from a URL.
#[derive(Debug, Clone)]
pub struct HttpSensorSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSensorSource {
    // ---
    pub fn new(url: impl Into<String>) -> Self {
        HttpSensorSource {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl SensorSource for HttpSensorSource {
    // ---
    async fn sample(&self) -> WeatherResult<SensorSample> {
        // ---
        tracing::debug!("Sampling sensor at {}", self.url);
        let sample = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json::<SensorSample>()
            .await?;

        if !sample.temperature_c.is_finite()
            || !sample.humidity_pct.is_finite()
            || !sample.pressure_hpa.is_finite()
        {
            return Err(WeatherError::Sensor(format!(
                "non-numeric sample from {}: {:?}",
                self.url, sample
            )));
        }
        Ok(sample)
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Sine-wave generator: temperature peaks at 14:00 UTC, humidity moves
/// opposite to temperature, pressure drifts slowly around sea level.
#[derive(Debug, Clone)]
pub struct SyntheticSensor {
    base_temp_c: f64,
    base_humidity: f64,
    base_pressure: f64,
}

impl Default for SyntheticSensor {
    fn default() -> Self {
        SyntheticSensor {
            base_temp_c: 20.0,
            base_humidity: 60.0,
            base_pressure: 1013.25,
        }
    }
}

impl SyntheticSensor {
    // ---
    pub fn sample_at(&self, at: DateTime<Utc>) -> SensorSample {
        // ---
        let hour_of_day = at.hour() as f64 + at.minute() as f64 / 60.0;
        let temp_variation = 5.0 * ((hour_of_day - 8.0) * PI / 12.0).sin();
        let hours_since_epoch = at.timestamp() as f64 / 3600.0;

        let temperature_c = self.base_temp_c + temp_variation;
        let humidity_pct = (self.base_humidity - temp_variation * 2.0).clamp(30.0, 90.0);
        let pressure_hpa = self.base_pressure + (hours_since_epoch * 0.3).sin() * 5.0;

        SensorSample {
            temperature_c,
            humidity_pct,
            pressure_hpa,
            temp_from_humidity: Some(temperature_c + 0.4),
            temp_from_pressure: Some(temperature_c - 0.3),
            cpu_temp: None,
        }
    }
}

#[async_trait]
impl SensorSource for SyntheticSensor {
    // ---
    async fn sample(&self) -> WeatherResult<SensorSample> {
        Ok(self.sample_at(Utc::now()))
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

/// Turn a sensor sample into a bronze reading stamped `now`.
///
/// The board's temperature reads high from CPU heat; `calibration_offset_c` is
/// subtracted before rounding and the uncalibrated value is kept as
/// `temp_from_cpu`.
pub fn read_measurement(
    sample: &SensorSample,
    calibration_offset_c: f64,
    now: DateTime<Utc>,
) -> RawReading {
    // ---
    let calibrated_c = sample.temperature_c - calibration_offset_c;

    let mut reading = RawReading::new(now, calibrated_c, sample.humidity_pct, sample.pressure_hpa);
    reading.temp_from_cpu = Some(round_to(sample.temperature_c, 2));
    reading.temp_from_humidity = sample.temp_from_humidity.map(|t| round_to(t, 2));
    reading.temp_from_pressure = sample.temp_from_pressure.map(|t| round_to(t, 2));
    reading.cpu_temp = sample.cpu_temp;
    reading
}
