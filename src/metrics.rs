//! Derived weather metrics.
//!
//! Pure functions only: no I/O and no state. The enricher and the backfill job
//! both funnel through here so live and recomputed records agree whenever
//! they are handed the same historical window.

use chrono::Duration;

use crate::error::{WeatherError, WeatherResult};
use crate::models::{ComfortIndex, DailyStats, PressureTrend, PressureTrendLabel, RawReading};

// ---

/// Magnus formula constants.
const MAGNUS_A: f64 = 17.27;
const MAGNUS_B: f64 = 237.7;

/// Half-width of the match window around each trend horizon.
const TREND_TOLERANCE_MINUTES: i64 = 30;

/// Round to `decimals` places, ties to even (`68.25` -> `68.2`).
pub fn round_to(value: f64, decimals: i32) -> f64 {
    // ---
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

pub fn celsius_to_fahrenheit(temp_c: f64) -> f64 {
    temp_c * 1.8 + 32.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DewPoint {
    pub dew_point_c: f64,
    pub dew_point_f: f64,
}

/// Dew point via the Magnus approximation, both scales rounded to 2 decimals.
///
/// Fails with [`WeatherError::InvalidInput`] when `humidity_pct <= 0`, where
/// the logarithm is undefined.
pub fn dew_point(temp_c: f64, humidity_pct: f64) -> WeatherResult<DewPoint> {
    // ---
    if !(humidity_pct > 0.0) || !temp_c.is_finite() {
        return Err(WeatherError::InvalidInput(format!(
            "dew point undefined for temp_c={temp_c}, humidity={humidity_pct}"
        )));
    }

    let alpha = (MAGNUS_A * temp_c) / (MAGNUS_B + temp_c) + (humidity_pct / 100.0).ln();
    let dew_point_c = (MAGNUS_B * alpha) / (MAGNUS_A - alpha);

    Ok(DewPoint {
        dew_point_c: round_to(dew_point_c, 2),
        dew_point_f: round_to(celsius_to_fahrenheit(dew_point_c), 2),
    })
}

/// Classify comfort. First matching rule wins; temperature beats humidity.
pub fn comfort_index(temp_f: f64, humidity_pct: f64, dew_point_f: f64) -> ComfortIndex {
    // ---
    if temp_f < 60.0 {
        ComfortIndex::TooCold
    } else if temp_f > 80.0 {
        ComfortIndex::TooHot
    } else if humidity_pct < 30.0 {
        ComfortIndex::TooDry
    } else if dew_point_f > 65.0 || humidity_pct > 70.0 {
        ComfortIndex::TooHumid
    } else {
        ComfortIndex::Comfortable
    }
}

/// Map a pressure delta to its label. `None` yields `Unknown`.
pub fn trend_label(delta_hpa: Option<f64>) -> PressureTrendLabel {
    // ---
    match delta_hpa {
        None => PressureTrendLabel::Unknown,
        Some(d) if d < -3.0 => PressureTrendLabel::RapidlyFalling,
        Some(d) if d < -1.0 => PressureTrendLabel::Falling,
        Some(d) if d <= 1.0 => PressureTrendLabel::Steady,
        Some(d) if d <= 3.0 => PressureTrendLabel::Rising,
        Some(_) => PressureTrendLabel::RapidlyRising,
    }
}

/// Pressure of the first reading in `historical` whose age lies within ±30
/// minutes of `horizon_hours`. Readings without a pressure are passed over.
fn first_in_horizon(
    current: &RawReading,
    historical: &[RawReading],
    horizon_hours: i64,
) -> Option<f64> {
    // ---
    let earliest = Duration::hours(horizon_hours) - Duration::minutes(TREND_TOLERANCE_MINUTES);
    let latest = Duration::hours(horizon_hours) + Duration::minutes(TREND_TOLERANCE_MINUTES);

    historical.iter().find_map(|r| {
        let age = current.timestamp - r.timestamp;
        (age >= earliest && age <= latest).then_some(r.pressure_hpa).flatten()
    })
}

/// Pressure change over the 3h and 6h horizons.
///
/// Each horizon takes the first qualifying reading in iteration order, so
/// callers control tie-breaking through the order of `historical`. A matched
/// reading always yields a delta, including an exact zero. A current reading
/// without a pressure has no trend.
pub fn pressure_trend(current: &RawReading, historical: &[RawReading]) -> PressureTrend {
    // ---
    let Some(pressure_now) = current.pressure_hpa else {
        return PressureTrend::default();
    };
    let delta = |matched: Option<f64>| matched.map(|p| round_to(pressure_now - p, 2));

    let trend_3h = delta(first_in_horizon(current, historical, 3));
    let trend_6h = delta(first_in_horizon(current, historical, 6));

    PressureTrend {
        pressure_trend_3h: trend_3h,
        pressure_trend_6h: trend_6h,
        pressure_trend_label: trend_label(trend_3h.or(trend_6h)),
    }
}

/// Daily min/max/avg over `todays_readings`, rounded to 1 decimal.
///
/// Missing or non-finite values are excluded from the aggregate they belong
/// to only. An empty input yields all-`None`.
pub fn daily_stats<'a, I>(todays_readings: I) -> DailyStats
where
    I: IntoIterator<Item = &'a RawReading>,
{
    // ---
    let mut temps = Vec::new();
    let mut humidities = Vec::new();
    let mut pressures = Vec::new();

    for r in todays_readings {
        if r.temperature_f.is_finite() {
            temps.push(r.temperature_f);
        }
        humidities.extend(r.humidity_pct.filter(|h| h.is_finite()));
        pressures.extend(r.pressure_hpa.filter(|p| p.is_finite()));
    }

    let mean = |values: &[f64]| {
        (!values.is_empty()).then(|| round_to(values.iter().sum::<f64>() / values.len() as f64, 1))
    };

    DailyStats {
        daily_temp_min: temps.iter().copied().reduce(f64::min).map(|v| round_to(v, 1)),
        daily_temp_max: temps.iter().copied().reduce(f64::max).map(|v| round_to(v, 1)),
        daily_temp_avg: mean(&temps),
        daily_humidity_avg: mean(&humidities),
        daily_pressure_avg: mean(&pressures),
    }
}
