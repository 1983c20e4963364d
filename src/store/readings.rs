//! Bronze/silver layer view over a [`BlobStore`].
//!
//! Objects live under `{prefix}/{YYYY-MM-DD}/{timestamp}.json`, where the
//! timestamp is the reading's `ts` with `:` replaced by `-`. The date segment is
//! the reading's UTC date, so a time range maps onto a contiguous run of
//! partitions.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::blob::{BlobStore, ObjectMeta};
use crate::error::{WeatherError, WeatherResult};
use crate::models::{ts_format, Timestamped};

// ---

/// Default number of objects fetched by [`ReadingStore::get_latest`].
const DEFAULT_LATEST_SCAN_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    /// Raw readings as sampled.
    Bronze,
    /// Enriched readings.
    Silver,
}

/// Blob key for a reading taken at `ts` under `prefix`.
pub fn object_key(prefix: &str, ts: &DateTime<Utc>) -> String {
    // ---
    let name = ts_format::format(ts).replace(':', "-");
    format!("{}/{}/{}.json", prefix, ts.format("%Y-%m-%d"), name)
}

/// Recover the timestamp encoded in an object key, if it has one.
pub fn timestamp_from_key(key: &str) -> Option<DateTime<Utc>> {
    // ---
    let name = key.rsplit('/').next()?.strip_suffix(".json")?;
    let (date, time) = name.split_once('T')?;
    ts_format::parse(&format!("{}T{}", date, time.replace('-', ":"))).ok()
}

#[derive(Clone)]
pub struct ReadingStore {
    blobs: Arc<dyn BlobStore>,
    bronze_prefix: String,
    silver_prefix: String,
    latest_scan_limit: usize,
}

impl ReadingStore {
    // ---
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        bronze_prefix: impl Into<String>,
        silver_prefix: impl Into<String>,
    ) -> Self {
        // ---
        ReadingStore {
            blobs,
            bronze_prefix: bronze_prefix.into().trim_end_matches('/').to_string(),
            silver_prefix: silver_prefix.into().trim_end_matches('/').to_string(),
            latest_scan_limit: DEFAULT_LATEST_SCAN_LIMIT,
        }
    }

    pub fn with_latest_scan_limit(mut self, limit: usize) -> Self {
        self.latest_scan_limit = limit.max(1);
        self
    }

    pub fn prefix(&self, layer: Layer) -> &str {
        // ---
        match layer {
            Layer::Bronze => &self.bronze_prefix,
            Layer::Silver => &self.silver_prefix,
        }
    }

    /// Write `reading` under its timestamp key, replacing any previous object.
    ///
    /// Returns the key written.
    pub async fn put<T>(&self, layer: Layer, reading: &T) -> WeatherResult<String>
    where
        T: Serialize + Timestamped,
    {
        // ---
        let key = object_key(self.prefix(layer), &reading.timestamp());
        let body = serde_json::to_vec(reading)
            .map_err(|e| WeatherError::InvalidInput(format!("cannot encode {key}: {e}")))?;

        self.blobs.put(&key, body).await?;
        debug!("Stored {}", key);
        Ok(key)
    }

    /// Every reading with `start <= ts <= end`, ascending by timestamp.
    ///
    /// Unreadable objects and failed partitions are logged and skipped. Only when
    /// every partition in range fails is the outage reported to the caller.
    pub async fn list_window<T>(
        &self,
        layer: Layer,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> WeatherResult<Vec<T>>
    where
        T: DeserializeOwned + Timestamped,
    {
        // ---
        if start > end {
            return Ok(Vec::new());
        }

        let dates = partition_dates(start.date_naive(), end.date_naive());
        let mut readings: Vec<T> = Vec::new();
        let mut failures = 0;

        for date in &dates {
            match self.read_partition::<T>(layer, *date).await {
                Ok(partition) => readings.extend(
                    partition
                        .into_iter()
                        .filter(|r| r.timestamp() >= start && r.timestamp() <= end),
                ),
                Err(e) => {
                    warn!("Error listing objects for date {}: {}", date, e);
                    failures += 1;
                }
            }
        }

        if failures == dates.len() {
            return Err(WeatherError::StoreUnavailable(format!(
                "no partition readable between {} and {}",
                start, end
            )));
        }

        readings.sort_by_key(|r| r.timestamp());
        debug!(
            "Found {} {:?} readings between {} and {}",
            readings.len(),
            layer,
            start,
            end
        );
        Ok(readings)
    }

    /// Most recent reading in today's and yesterday's partitions.
    ///
    /// Both partitions are listed in full and their keys ordered by the
    /// timestamp they encode; only the newest `latest_scan_limit` objects are
    /// fetched. Readings older than yesterday are never returned.
    pub async fn get_latest<T>(&self, layer: Layer, now: DateTime<Utc>) -> WeatherResult<Option<T>>
    where
        T: DeserializeOwned + Timestamped,
    {
        // ---
        let today = now.date_naive();
        let yesterday = today.checked_sub_days(Days::new(1)).unwrap_or(today);

        let mut candidates: Vec<(Option<DateTime<Utc>>, ObjectMeta)> = Vec::new();
        let mut failures = 0;
        for date in [today, yesterday] {
            match self.blobs.list(&self.partition_prefix(layer, date)).await {
                Ok(objects) => candidates.extend(
                    objects
                        .into_iter()
                        .filter(|o| o.key.ends_with(".json"))
                        .map(|o| (timestamp_from_key(&o.key), o)),
                ),
                Err(e) => {
                    warn!("Error listing objects for date {}: {}", date, e);
                    failures += 1;
                }
            }
        }

        if failures == 2 {
            return Err(WeatherError::StoreUnavailable(format!(
                "cannot list {:?} partitions for {} or {}",
                layer, today, yesterday
            )));
        }

        // Newest key first; keys without an encoded timestamp rank by modification time
        candidates.sort_by(|(ts_a, a), (ts_b, b)| {
            ts_b.cmp(ts_a).then_with(|| b.last_modified.cmp(&a.last_modified))
        });

        let mut latest: Option<T> = None;
        for (_, meta) in candidates.into_iter().take(self.latest_scan_limit) {
            match self.fetch::<T>(&meta.key).await {
                Ok(reading) => {
                    if latest.as_ref().map_or(true, |l| reading.timestamp() > l.timestamp()) {
                        latest = Some(reading);
                    }
                }
                Err(e) => warn!("Error reading object {}: {}", meta.key, e),
            }
        }

        Ok(latest)
    }

    /// Distinct date partitions present in `layer`, ascending.
    pub async fn list_dates(&self, layer: Layer) -> WeatherResult<Vec<NaiveDate>> {
        // ---
        let prefix = format!("{}/", self.prefix(layer));
        let objects = self.blobs.list(&prefix).await?;

        let dates: BTreeSet<NaiveDate> = objects
            .iter()
            .filter_map(|o| o.key.strip_prefix(&prefix)?.split('/').next())
            .filter_map(|segment| NaiveDate::parse_from_str(segment, "%Y-%m-%d").ok())
            .collect();

        Ok(dates.into_iter().collect())
    }

    // ---

    fn partition_prefix(&self, layer: Layer, date: NaiveDate) -> String {
        format!("{}/{}/", self.prefix(layer), date.format("%Y-%m-%d"))
    }

    async fn read_partition<T>(&self, layer: Layer, date: NaiveDate) -> WeatherResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        // ---
        let objects = self.blobs.list(&self.partition_prefix(layer, date)).await?;

        let mut readings = Vec::with_capacity(objects.len());
        for meta in objects.iter().filter(|o| o.key.ends_with(".json")) {
            match self.fetch::<T>(&meta.key).await {
                Ok(reading) => readings.push(reading),
                Err(e) => warn!("Error reading object {}: {}", meta.key, e),
            }
        }
        Ok(readings)
    }

    async fn fetch<T>(&self, key: &str) -> WeatherResult<T>
    where
        T: DeserializeOwned,
    {
        // ---
        let body = self.blobs.get(key).await?;
        serde_json::from_slice(&body).map_err(|e| WeatherError::MalformedRecord {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Every calendar date from `start` to `end`, inclusive.
fn partition_dates(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}
