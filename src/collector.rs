//! Live collection loop: sample, enrich, write, sleep.
//!
//! The loop is strictly sequential. The newest enriched reading is published
//! through a `watch` channel so the API can serve it without touching the
//! store; each publish replaces the whole value.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::enricher::Enricher;
use crate::error::WeatherResult;
use crate::models::EnrichedReading;
use crate::sensor::{read_measurement, SensorSource};
use crate::store::{Layer, ReadingStore};
use crate::Config;

// ---

pub type LatestReading = watch::Receiver<Option<EnrichedReading>>;

pub struct Collector {
    source: Arc<dyn SensorSource>,
    store: ReadingStore,
    enricher: Enricher,
    calibration_offset_c: f64,
    interval: std::time::Duration,
    latest: watch::Sender<Option<EnrichedReading>>,
}

impl Collector {
    // ---
    pub fn new(source: Arc<dyn SensorSource>, store: ReadingStore, cfg: &Config) -> Self {
        // ---
        let (latest, _) = watch::channel(None);
        Collector {
            enricher: Enricher::new(store.clone(), Duration::hours(cfg.trend_recalc_hours)),
            source,
            store,
            calibration_offset_c: cfg.temp_calibration_offset_c,
            interval: std::time::Duration::from_secs(cfg.sample_interval_sec),
            latest,
        }
    }

    /// Receiver for the most recent enriched reading.
    pub fn subscribe(&self) -> LatestReading {
        self.latest.subscribe()
    }

    /// One tick. Only a sensor failure is returned as an error; store failures
    /// are logged and the reading is still enriched and published.
    pub async fn run_once(&mut self, now: DateTime<Utc>) -> WeatherResult<EnrichedReading> {
        // ---
        let sample = self.source.sample().await?;
        let raw = read_measurement(&sample, self.calibration_offset_c, now);

        if let Err(e) = self.store.put(Layer::Bronze, &raw).await {
            error!("Bronze upload error for {}: {}", raw.timestamp, e);
        }

        let enriched = self.enricher.enrich(&raw, now).await;

        match self.store.put(Layer::Silver, &enriched).await {
            Ok(key) => info!("Uploaded {}", key),
            Err(e) => error!("Silver upload error for {}: {}", raw.timestamp, e),
        }

        self.latest.send_replace(Some(enriched.clone()));
        Ok(enriched)
    }

    /// Sample every interval until `shutdown` resolves.
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        // ---
        info!(
            "Collector started: source={}, interval={}s",
            self.source.name(),
            self.interval.as_secs()
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once(Utc::now()).await {
                        warn!("Skipping sample: {}", e);
                    }
                }
                _ = &mut shutdown => {
                    info!("Collector stopping");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::error::WeatherError;
    use crate::models::{PressureTrendLabel, RawReading, SensorSample};
    use crate::store::MemoryBlobStore;
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct FixedSensor(SensorSample);

    #[async_trait]
    impl SensorSource for FixedSensor {
        async fn sample(&self) -> WeatherResult<SensorSample> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct BrokenSensor;

    #[async_trait]
    impl SensorSource for BrokenSensor {
        async fn sample(&self) -> WeatherResult<SensorSample> {
            Err(WeatherError::Sensor("i2c timeout".into()))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn sample() -> SensorSample {
        // ---
        SensorSample {
            temperature_c: 24.0,
            humidity_pct: 50.0,
            pressure_hpa: 1012.0,
            temp_from_humidity: None,
            temp_from_pressure: None,
            cpu_temp: None,
        }
    }

    fn setup(source: Arc<dyn SensorSource>) -> (Arc<MemoryBlobStore>, ReadingStore, Collector) {
        // ---
        let blobs = Arc::new(MemoryBlobStore::new());
        let store = ReadingStore::new(blobs.clone(), "samples", "silver");
        let cfg = Config {
            temp_calibration_offset_c: 2.0,
            ..Config::default()
        };
        let collector = Collector::new(source, store.clone(), &cfg);
        (blobs, store, collector)
    }

    #[tokio::test]
    async fn test_tick_writes_both_layers_and_publishes() {
        // ---
        let (blobs, store, mut collector) = setup(Arc::new(FixedSensor(sample())));
        let latest = collector.subscribe();
        let now = Utc.with_ymd_and_hms(2025, 10, 6, 20, 15, 3).unwrap();

        let enriched = collector.run_once(now).await.unwrap();
        assert_eq!(enriched.raw.temperature_c, 22.0);
        assert_eq!(enriched.raw.temp_from_cpu, Some(24.0));
        assert_eq!(enriched.daily.daily_temp_avg, Some(71.6));

        assert_eq!(
            blobs.keys().await,
            vec![
                "samples/2025-10-06/2025-10-06T20-15-03Z.json",
                "silver/2025-10-06/2025-10-06T20-15-03Z.json",
            ]
        );
        let stored: Option<RawReading> = store.get_latest(Layer::Bronze, now).await.unwrap();
        assert_eq!(stored.unwrap().temperature_c, 22.0);
        assert_eq!(latest.borrow().as_ref(), Some(&enriched));
    }

    #[tokio::test]
    async fn test_second_tick_is_throttled() {
        // ---
        let (_, _, mut collector) = setup(Arc::new(FixedSensor(sample())));
        let first = Utc.with_ymd_and_hms(2025, 10, 6, 8, 0, 0).unwrap();

        collector.run_once(first).await.unwrap();
        let second = collector.run_once(first + Duration::minutes(15)).await.unwrap();

        assert_eq!(second.trend.pressure_trend_label, PressureTrendLabel::Calculating);
        assert_eq!(second.daily.daily_temp_avg, Some(71.6));
    }

    #[tokio::test]
    async fn test_sensor_failure_skips_tick() {
        // ---
        let (blobs, _, mut collector) = setup(Arc::new(BrokenSensor));
        let now = Utc.with_ymd_and_hms(2025, 10, 6, 8, 0, 0).unwrap();

        assert!(matches!(collector.run_once(now).await, Err(WeatherError::Sensor(_))));
        assert!(blobs.keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_store_outage_does_not_stop_the_loop() {
        // ---
        let (blobs, _, mut collector) = setup(Arc::new(FixedSensor(sample())));
        let latest = collector.subscribe();
        blobs.set_offline(true);

        let now = Utc.with_ymd_and_hms(2025, 10, 6, 8, 0, 0).unwrap();
        let enriched = collector.run_once(now).await.unwrap();

        assert!(enriched.dew_point_c.is_some());
        assert!(latest.borrow().is_some());
    }
}
