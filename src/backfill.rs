//! Regenerate the silver layer from bronze for a time range.
//!
//! Every raw reading in range is re-derived against windows cut from the one
//! pre-fetched, read-only snapshot of bronze: the 7 hours before it for the
//! pressure trend and its own UTC day up to and including it for daily stats.
//! Unlike the live enricher, the trend is recomputed for every reading, so a
//! backfilled record may differ from the one written live for the same instant.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::enricher::{derive_from_windows, TREND_LOOKBACK_HOURS};
use crate::error::{WeatherError, WeatherResult};
use crate::models::RawReading;
use crate::store::{Layer, ReadingStore};

// ---

pub const MIN_DAYS: i64 = 1;
pub const MAX_DAYS: i64 = 30;

const PROGRESS_EVERY: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillStats {
    pub total: usize,
    pub processed: usize,
    pub written: usize,
    pub errors: usize,
}

impl BackfillStats {
    pub fn is_clean(&self) -> bool {
        self.errors == 0
    }
}

/// Check a `--days` argument against the supported range.
pub fn validate_days(days: i64) -> WeatherResult<i64> {
    // ---
    if (MIN_DAYS..=MAX_DAYS).contains(&days) {
        Ok(days)
    } else {
        Err(WeatherError::Validation(format!(
            "--days must be between {MIN_DAYS} and {MAX_DAYS}, got {days}"
        )))
    }
}

/// `[now - days, now]`.
pub fn range_for_days(days: i64, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (now - Duration::days(days), now)
}

/// Recompute silver readings for every bronze reading in `[start, end]`.
///
/// With `dry_run` nothing is written. Failures on single readings are counted
/// in [`BackfillStats::errors`] and the batch carries on; only an unreadable
/// bronze layer aborts.
pub async fn backfill(
    store: &ReadingStore,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    dry_run: bool,
) -> WeatherResult<BackfillStats> {
    // ---
    info!(
        "{} from {} to {}",
        if dry_run { "Dry run" } else { "Backfill" },
        start,
        end
    );

    let bronze: Vec<RawReading> = store.list_window(Layer::Bronze, start, end).await?;
    let mut stats = BackfillStats {
        total: bronze.len(),
        ..Default::default()
    };

    if bronze.is_empty() {
        warn!("No bronze readings found between {} and {}", start, end);
        return Ok(stats);
    }

    let days: BTreeSet<_> = bronze.iter().map(|r| r.timestamp.date_naive()).collect();
    info!(
        "Processing {} readings across {} day(s)",
        bronze.len(),
        days.len()
    );

    for (idx, raw) in bronze.iter().enumerate() {
        // ---
        let (historical, todays) = windows_for(&bronze, raw);
        let silver = derive_from_windows(raw, historical, todays);
        stats.processed += 1;

        if !dry_run {
            match store.put(Layer::Silver, &silver).await {
                Ok(_) => stats.written += 1,
                Err(e) => {
                    warn!("Error processing reading {}: {}", raw.timestamp, e);
                    stats.errors += 1;
                }
            }
        }

        if (idx + 1) % PROGRESS_EVERY == 0 || idx + 1 == bronze.len() {
            let progress = (idx + 1) as f64 / bronze.len() as f64 * 100.0;
            info!(
                "Progress: {}/{} ({:.1}%) - Latest: {}",
                idx + 1,
                bronze.len(),
                progress,
                raw.timestamp
            );
        }
    }

    Ok(stats)
}

/// Trend and same-day windows for `raw`, cut from the ascending `sorted` snapshot.
fn windows_for<'a>(sorted: &'a [RawReading], raw: &RawReading) -> (&'a [RawReading], &'a [RawReading]) {
    // ---
    let lookback = raw.timestamp - Duration::hours(TREND_LOOKBACK_HOURS);
    let day_start = raw
        .timestamp
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or(raw.timestamp);

    let before = sorted.partition_point(|r| r.timestamp < raw.timestamp);
    let through = sorted.partition_point(|r| r.timestamp <= raw.timestamp);
    let history_from = sorted.partition_point(|r| r.timestamp < lookback);
    let day_from = sorted.partition_point(|r| r.timestamp < day_start);

    (&sorted[history_from..before], &sorted[day_from..through])
}
