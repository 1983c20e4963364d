//! Data models for the weather pipeline.
//!
//! - [`RawReading`] is the bronze record, one per sample tick.
//! - [`EnrichedReading`] is the silver record: the raw reading plus derived metrics.
//!
//! Both serialize to the flat JSON objects stored in the blob store, with the
//! timestamp under `ts` in ISO-8601 form with a literal `Z` suffix.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::{celsius_to_fahrenheit, round_to};

// ---

/// Serde adapter for `ts` fields.
///
/// Whole seconds render as `2025-10-06T20:15:03Z`; sub-second instants carry
/// exactly six fractional digits (`2025-10-06T20:15:03.120000Z`). Parsing accepts
/// any RFC 3339 instant and truncates it to microseconds.
pub mod ts_format {
    // ---
    use chrono::{DateTime, SubsecRound, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(ts: &DateTime<Utc>) -> String {
        // ---
        let micros = ts.timestamp_subsec_micros();
        if micros == 0 {
            ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()
        } else {
            format!("{}.{:06}Z", ts.format("%Y-%m-%dT%H:%M:%S"), micros)
        }
    }

    pub fn parse(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc).trunc_subsecs(6))
    }

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Anything stored under a timestamp key.
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

/// One instantaneous sample from a [`crate::SensorSource`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SensorSample {
    // ---
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub pressure_hpa: f64,
    #[serde(default)]
    pub temp_from_humidity: Option<f64>,
    #[serde(default)]
    pub temp_from_pressure: Option<f64>,
    #[serde(default)]
    pub cpu_temp: Option<f64>,
}

/// Bronze reading as sampled.
///
/// `temperature_f` is always derived from `temperature_c`, including on
/// deserialization, so a stored Fahrenheit value never drifts from its source.
/// Humidity and pressure may be absent on stored objects; each derived metric
/// that needs one of them is left out for that reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawReadingRecord")]
pub struct RawReading {
    // ---
    #[serde(rename = "ts", with = "ts_format")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "temp_c")]
    pub temperature_c: f64,
    #[serde(rename = "temp_f")]
    pub temperature_f: f64,
    #[serde(rename = "humidity", skip_serializing_if = "Option::is_none")]
    pub humidity_pct: Option<f64>,
    #[serde(rename = "pressure", skip_serializing_if = "Option::is_none")]
    pub pressure_hpa: Option<f64>,

    // Diagnostics, carried through untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_from_humidity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_from_pressure: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_from_cpu: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_temp: Option<f64>,
}

/// On-disk shape of a bronze object. `temp_f` is accepted but ignored.
#[derive(Deserialize)]
struct RawReadingRecord {
    #[serde(with = "ts_format")]
    ts: DateTime<Utc>,
    temp_c: f64,
    #[serde(default)]
    humidity: Option<f64>,
    #[serde(default)]
    pressure: Option<f64>,
    #[serde(default)]
    temp_from_humidity: Option<f64>,
    #[serde(default)]
    temp_from_pressure: Option<f64>,
    #[serde(default)]
    temp_from_cpu: Option<f64>,
    #[serde(default)]
    cpu_temp: Option<f64>,
}

impl From<RawReadingRecord> for RawReading {
    fn from(r: RawReadingRecord) -> Self {
        // ---
        let mut reading = RawReading::from_parts(r.ts, r.temp_c, r.humidity, r.pressure);
        reading.temp_from_humidity = r.temp_from_humidity;
        reading.temp_from_pressure = r.temp_from_pressure;
        reading.temp_from_cpu = r.temp_from_cpu;
        reading.cpu_temp = r.cpu_temp;
        reading
    }
}

impl RawReading {
    // ---
    /// Build a reading with 2-decimal rounding; Fahrenheit derives from the
    /// rounded Celsius so a stored reading decodes to the same value.
    pub fn new(
        timestamp: DateTime<Utc>,
        temperature_c: f64,
        humidity_pct: f64,
        pressure_hpa: f64,
    ) -> Self {
        RawReading::from_parts(timestamp, temperature_c, Some(humidity_pct), Some(pressure_hpa))
    }

    /// Same as [`RawReading::new`] with humidity and pressure optional.
    pub fn from_parts(
        timestamp: DateTime<Utc>,
        temperature_c: f64,
        humidity_pct: Option<f64>,
        pressure_hpa: Option<f64>,
    ) -> Self {
        // ---
        let temperature_c = round_to(temperature_c, 2);
        RawReading {
            timestamp: timestamp.trunc_subsecs(6),
            temperature_c,
            temperature_f: round_to(celsius_to_fahrenheit(temperature_c), 2),
            humidity_pct: humidity_pct.map(|h| round_to(h, 2)),
            pressure_hpa: pressure_hpa.map(|p| round_to(p, 2)),
            temp_from_humidity: None,
            temp_from_pressure: None,
            temp_from_cpu: None,
            cpu_temp: None,
        }
    }
}

impl Timestamped for RawReading {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Comfort classification of a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComfortIndex {
    TooCold,
    TooHot,
    TooDry,
    TooHumid,
    Comfortable,
}

/// Direction of the pressure change.
///
/// `Calculating` marks a live reading whose trend was skipped by the
/// recalculation throttle; `Unknown` means no historical sample matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureTrendLabel {
    RapidlyFalling,
    Falling,
    Steady,
    Rising,
    RapidlyRising,
    #[default]
    Unknown,
    Calculating,
}

/// Pressure deltas over the 3h and 6h horizons, in hPa.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PressureTrend {
    // ---
    pub pressure_trend_3h: Option<f64>,
    pub pressure_trend_6h: Option<f64>,
    #[serde(default)]
    pub pressure_trend_label: PressureTrendLabel,
}

impl PressureTrend {
    /// Placeholder emitted while the live trend throttle is holding.
    pub fn calculating() -> Self {
        // ---
        PressureTrend {
            pressure_trend_3h: None,
            pressure_trend_6h: None,
            pressure_trend_label: PressureTrendLabel::Calculating,
        }
    }
}

/// Rolling aggregates from 00:00 UTC through the reading's timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DailyStats {
    // ---
    pub daily_temp_min: Option<f64>,
    pub daily_temp_max: Option<f64>,
    pub daily_temp_avg: Option<f64>,
    pub daily_humidity_avg: Option<f64>,
    pub daily_pressure_avg: Option<f64>,
}

/// Silver reading: a raw reading plus everything derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedReading {
    // ---
    #[serde(flatten)]
    pub raw: RawReading,
    pub dew_point_c: Option<f64>,
    pub dew_point_f: Option<f64>,
    pub comfort_index: Option<ComfortIndex>,
    #[serde(flatten)]
    pub trend: PressureTrend,
    #[serde(flatten)]
    pub daily: DailyStats,
}

impl Timestamped for EnrichedReading {
    fn timestamp(&self) -> DateTime<Utc> {
        self.raw.timestamp
    }
}
