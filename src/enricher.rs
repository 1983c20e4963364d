//! Turns a raw reading into an enriched one.
//!
//! [`derive`] is the pure step shared with the backfill job. [`Enricher`] is
//! the stateful live variant owned by the collector: it pulls its historical
//! windows from the [`ReadingStore`] and throttles the pressure trend, while
//! daily stats are recomputed on every call.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::metrics::{comfort_index, daily_stats, dew_point, pressure_trend};
use crate::models::{DailyStats, EnrichedReading, PressureTrend, RawReading};
use crate::store::{Layer, ReadingStore};

// ---

/// How far back the trend window reaches; covers the 6h horizon plus tolerance.
pub const TREND_LOOKBACK_HOURS: i64 = 7;

/// Default live throttle between pressure-trend recalculations.
pub const DEFAULT_TREND_INTERVAL_HOURS: i64 = 6;

/// Attach dew point and comfort index to `raw` alongside the given trend and stats.
///
/// A missing humidity or a dew point that cannot be computed leaves the dew
/// point and comfort fields empty; the rest of the record is still produced.
pub fn derive(raw: &RawReading, trend: PressureTrend, daily: DailyStats) -> EnrichedReading {
    // ---
    let dew = raw.humidity_pct.and_then(|humidity| {
        match dew_point(raw.temperature_c, humidity) {
            Ok(dew) => Some((dew, humidity)),
            Err(e) => {
                warn!("Skipping dew point for {}: {}", raw.timestamp, e);
                None
            }
        }
    });
    if raw.humidity_pct.is_none() {
        debug!("No humidity on {}, dew point and comfort left empty", raw.timestamp);
    }
    let comfort = dew.map(|(d, humidity)| comfort_index(raw.temperature_f, humidity, d.dew_point_f));
    let dew = dew.map(|(d, _)| d);

    EnrichedReading {
        raw: raw.clone(),
        dew_point_c: dew.map(|d| d.dew_point_c),
        dew_point_f: dew.map(|d| d.dew_point_f),
        comfort_index: comfort,
        trend,
        daily,
    }
}

/// [`derive`] with the trend and daily stats computed from explicit windows.
///
/// `historical` is searched in order for the trend; `todays_readings` is
/// aggregated as given.
pub fn derive_from_windows(
    raw: &RawReading,
    historical: &[RawReading],
    todays_readings: &[RawReading],
) -> EnrichedReading {
    // ---
    derive(raw, pressure_trend(raw, historical), daily_stats(todays_readings))
}

/// Bronze readings in `[raw.ts - 7h, raw.ts)`, ascending.
async fn trend_history(
    store: &ReadingStore,
    raw: &RawReading,
) -> crate::WeatherResult<Vec<RawReading>> {
    // ---
    let start = raw.timestamp - Duration::hours(TREND_LOOKBACK_HOURS);
    let mut history: Vec<RawReading> = store
        .list_window(Layer::Bronze, start, raw.timestamp)
        .await?;
    history.retain(|r| r.timestamp < raw.timestamp);
    Ok(history)
}

async fn fresh_trend(store: &ReadingStore, raw: &RawReading) -> Option<PressureTrend> {
    // ---
    match trend_history(store, raw).await {
        Ok(history) => Some(pressure_trend(raw, &history)),
        Err(e) => {
            warn!("Pressure trend unavailable for {}: {}", raw.timestamp, e);
            None
        }
    }
}

/// Daily stats for the UTC day of `now`, from 00:00 through `now`.
///
/// `raw` is merged into the fetched set (replacing a stored copy with the same
/// timestamp) so a reading that has not landed in the store yet still counts.
pub async fn todays_stats(store: &ReadingStore, raw: &RawReading, now: DateTime<Utc>) -> DailyStats {
    // ---
    let day_start = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or(now);

    match store.list_window::<RawReading>(Layer::Bronze, day_start, now).await {
        Ok(mut todays) => {
            todays.retain(|r| r.timestamp != raw.timestamp);
            todays.push(raw.clone());
            daily_stats(&todays)
        }
        Err(e) => {
            warn!("Daily stats unavailable for {}: {}", now.date_naive(), e);
            DailyStats::default()
        }
    }
}

/// Enrich `raw` with every section recomputed, ignoring any throttle.
pub async fn enrich_fresh(store: &ReadingStore, raw: &RawReading, now: DateTime<Utc>) -> EnrichedReading {
    // ---
    let trend = fresh_trend(store, raw).await.unwrap_or_default();
    let daily = todays_stats(store, raw, now).await;
    derive(raw, trend, daily)
}

/// Live enricher for a single collection loop.
///
/// Owns the time of the last pressure-trend calculation. Until more than
/// `trend_interval` has passed since then, readings carry a `calculating`
/// trend instead of hitting the store for history.
pub struct Enricher {
    store: ReadingStore,
    trend_interval: Duration,
    last_pressure_calc_time: Option<DateTime<Utc>>,
}

impl Enricher {
    // ---
    pub fn new(store: ReadingStore, trend_interval: Duration) -> Self {
        // ---
        Enricher {
            store,
            trend_interval,
            last_pressure_calc_time: None,
        }
    }

    pub fn last_pressure_calc_time(&self) -> Option<DateTime<Utc>> {
        self.last_pressure_calc_time
    }

    fn trend_due(&self, now: DateTime<Utc>) -> bool {
        // ---
        self.last_pressure_calc_time
            .map_or(true, |last| now - last > self.trend_interval)
    }

    pub async fn enrich(&mut self, raw: &RawReading, now: DateTime<Utc>) -> EnrichedReading {
        // ---
        let trend = if self.trend_due(now) {
            match fresh_trend(&self.store, raw).await {
                Some(trend) => {
                    debug!("Recomputed pressure trend: {:?}", trend.pressure_trend_label);
                    self.last_pressure_calc_time = Some(now);
                    trend
                }
                // Leave the throttle open so the next tick retries
                None => PressureTrend::default(),
            }
        } else {
            PressureTrend::calculating()
        };

        let daily = todays_stats(&self.store, raw, now).await;
        derive(raw, trend, daily)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::{ComfortIndex, PressureTrendLabel};
    use crate::store::{BlobStore, MemoryBlobStore};
    use chrono::TimeZone;
    use std::sync::Arc;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 6, h, m, 0).unwrap()
    }

    fn setup() -> (Arc<MemoryBlobStore>, ReadingStore) {
        // ---
        let blobs = Arc::new(MemoryBlobStore::new());
        let store = ReadingStore::new(blobs.clone(), "samples", "silver");
        (blobs, store)
    }

    async fn seed(store: &ReadingStore, readings: &[RawReading]) {
        for r in readings {
            store.put(Layer::Bronze, r).await.unwrap();
        }
    }

    #[test]
    fn test_derive_fills_dew_point_and_comfort() {
        // ---
        let raw = RawReading::new(at(12, 0), 22.0, 45.0, 1013.0);
        let enriched = derive_from_windows(&raw, &[], std::slice::from_ref(&raw));

        assert!(enriched.dew_point_c.is_some());
        assert_eq!(enriched.comfort_index, Some(ComfortIndex::Comfortable));
        assert_eq!(enriched.trend.pressure_trend_label, PressureTrendLabel::Unknown);
        assert_eq!(enriched.daily.daily_temp_avg, Some(71.6));
        assert_eq!(enriched.raw, raw);
    }

    #[test]
    fn test_derive_survives_invalid_dew_point() {
        // ---
        let raw = RawReading::new(at(12, 0), 22.0, 0.0, 1013.0);
        let enriched = derive_from_windows(&raw, &[], std::slice::from_ref(&raw));

        assert_eq!(enriched.dew_point_c, None);
        assert_eq!(enriched.dew_point_f, None);
        assert_eq!(enriched.comfort_index, None);
        assert_eq!(enriched.daily.daily_humidity_avg, Some(0.0));
    }

    #[tokio::test]
    async fn test_enrich_fresh_is_deterministic() {
        // ---
        let (_, store) = setup();
        seed(
            &store,
            &[
                RawReading::new(at(6, 0), 18.0, 60.0, 1016.0),
                RawReading::new(at(9, 0), 19.0, 55.0, 1014.5),
            ],
        )
        .await;

        let raw = RawReading::new(at(12, 0), 21.0, 50.0, 1012.0);
        let first = enrich_fresh(&store, &raw, at(12, 0)).await;
        let second = enrich_fresh(&store, &raw, at(12, 0)).await;

        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
        assert_eq!(first.trend.pressure_trend_3h, Some(-2.5));
        assert_eq!(first.trend.pressure_trend_6h, Some(-4.0));
        assert_eq!(first.trend.pressure_trend_label, PressureTrendLabel::Falling);
    }

    #[tokio::test]
    async fn test_daily_stats_include_unstored_current_reading() {
        // ---
        let (_, store) = setup();
        seed(
            &store,
            &[
                // Previous day must not leak in
                RawReading::new(
                    Utc.with_ymd_and_hms(2025, 10, 5, 23, 50, 0).unwrap(),
                    0.0,
                    90.0,
                    990.0,
                ),
                RawReading::new(at(1, 0), 10.0, 40.0, 1000.0),
            ],
        )
        .await;

        let raw = RawReading::new(at(2, 0), 30.0, 60.0, 1020.0);
        let enriched = enrich_fresh(&store, &raw, at(2, 0)).await;

        assert_eq!(enriched.daily.daily_temp_min, Some(50.0));
        assert_eq!(enriched.daily.daily_temp_max, Some(86.0));
        assert_eq!(enriched.daily.daily_humidity_avg, Some(50.0));
        assert_eq!(enriched.daily.daily_pressure_avg, Some(1010.0));
    }

    #[tokio::test]
    async fn test_current_reading_is_not_double_counted() {
        // ---
        let (_, store) = setup();
        let earlier = RawReading::new(at(1, 0), 10.0, 40.0, 1000.0);
        let raw = RawReading::new(at(2, 0), 30.0, 60.0, 1020.0);
        seed(&store, &[earlier, raw.clone()]).await;

        let stats = todays_stats(&store, &raw, at(2, 0)).await;
        assert_eq!(stats.daily_temp_avg, Some(68.0));
    }

    #[tokio::test]
    async fn test_trend_is_throttled() {
        // ---
        let (_, store) = setup();
        seed(&store, &[RawReading::new(at(6, 0), 18.0, 60.0, 1016.0)]).await;
        let mut enricher = Enricher::new(store, Duration::hours(DEFAULT_TREND_INTERVAL_HOURS));

        let first = enricher.enrich(&RawReading::new(at(9, 0), 20.0, 50.0, 1015.0), at(9, 0)).await;
        assert_eq!(first.trend.pressure_trend_3h, Some(-1.0));
        assert_eq!(enricher.last_pressure_calc_time(), Some(at(9, 0)));

        // Exactly six hours later is still inside the throttle
        for (h, m) in [(9, 15), (12, 0), (15, 0)] {
            let held = enricher.enrich(&RawReading::new(at(h, m), 20.0, 50.0, 1015.0), at(h, m)).await;
            assert_eq!(held.trend, PressureTrend::calculating());
            assert!(held.daily.daily_temp_avg.is_some());
        }

        let reopened = enricher.enrich(&RawReading::new(at(15, 1), 20.0, 50.0, 1015.0), at(15, 1)).await;
        assert_ne!(reopened.trend.pressure_trend_label, PressureTrendLabel::Calculating);
        assert_eq!(enricher.last_pressure_calc_time(), Some(at(15, 1)));
    }

    #[tokio::test]
    async fn test_store_outage_leaves_sections_empty() {
        // ---
        let (blobs, store) = setup();
        blobs.set_offline(true);
        let mut enricher = Enricher::new(store, Duration::hours(DEFAULT_TREND_INTERVAL_HOURS));

        let raw = RawReading::new(at(9, 0), 20.0, 50.0, 1015.0);
        let enriched = enricher.enrich(&raw, at(9, 0)).await;

        assert!(enriched.dew_point_c.is_some());
        assert_eq!(enriched.trend.pressure_trend_label, PressureTrendLabel::Unknown);
        assert_eq!(enriched.daily, DailyStats::default());
        assert_eq!(enricher.last_pressure_calc_time(), None);
    }

    #[test]
    fn test_derive_without_humidity_skips_dew_point_only() {
        // ---
        let raw = RawReading::from_parts(at(12, 0), 22.0, None, Some(1013.0));
        let enriched = derive_from_windows(&raw, &[], std::slice::from_ref(&raw));

        assert_eq!(enriched.dew_point_c, None);
        assert_eq!(enriched.comfort_index, None);
        assert_eq!(enriched.daily.daily_temp_avg, Some(71.6));
        assert_eq!(enriched.daily.daily_humidity_avg, None);
        assert_eq!(enriched.daily.daily_pressure_avg, Some(1013.0));
    }

    #[tokio::test]
    async fn test_stored_reading_without_pressure_still_counts_for_temperature() {
        // ---
        let (blobs, store) = setup();
        seed(&store, &[RawReading::new(at(1, 0), 10.0, 40.0, 1000.0)]).await;
        blobs
            .put(
                "samples/2025-10-06/2025-10-06T02-00-00Z.json",
                br#"{"ts":"2025-10-06T02:00:00Z","temp_c":30.0,"temp_f":86.0,"humidity":60.0}"#
                    .to_vec(),
            )
            .await
            .unwrap();

        let raw = RawReading::new(at(3, 0), 20.0, 50.0, 1020.0);
        let stats = todays_stats(&store, &raw, at(3, 0)).await;

        assert_eq!(stats.daily_temp_min, Some(50.0));
        assert_eq!(stats.daily_temp_max, Some(86.0));
        assert_eq!(stats.daily_temp_avg, Some(68.0));
        assert_eq!(stats.daily_humidity_avg, Some(50.0));
        assert_eq!(stats.daily_pressure_avg, Some(1010.0));
    }
}
