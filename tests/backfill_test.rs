use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};

use weatherflow::backfill::{backfill, range_for_days};
use weatherflow::enricher::enrich_fresh;
use weatherflow::store::{BlobStore, MemoryBlobStore};
use weatherflow::{EnrichedReading, Layer, RawReading, ReadingStore, WeatherError};

// ---

/// Readings every 30 minutes from `now - 40h` to `now - 1h`, spanning two or three days.
async fn seed_bronze(store: &ReadingStore, now: DateTime<Utc>) -> Result<Vec<RawReading>> {
    // ---
    let mut readings = Vec::new();
    let mut ts = now - Duration::hours(40);
    let mut i = 0;
    while ts <= now - Duration::hours(1) {
        let raw = RawReading::new(
            ts,
            18.0 + (i % 12) as f64 * 0.5,
            45.0 + (i % 7) as f64,
            1008.0 + (i % 9) as f64 * 0.75,
        );
        store.put(Layer::Bronze, &raw).await?;
        readings.push(raw);
        ts += Duration::minutes(30);
        i += 1;
    }
    Ok(readings)
}

fn setup() -> (Arc<MemoryBlobStore>, ReadingStore) {
    // ---
    let blobs = Arc::new(MemoryBlobStore::new());
    let store = ReadingStore::new(blobs.clone(), "samples", "silver");
    (blobs, store)
}

async fn silver_keys(blobs: &MemoryBlobStore) -> Vec<String> {
    // ---
    blobs
        .keys()
        .await
        .into_iter()
        .filter(|k| k.starts_with("silver/"))
        .collect()
}

#[tokio::test]
async fn dry_run_processes_without_writing() -> Result<()> {
    // ---
    let (blobs, store) = setup();
    let now = Utc::now();
    let bronze = seed_bronze(&store, now).await?;

    let (start, end) = range_for_days(2, now);
    let stats = backfill(&store, start, end, true).await?;

    assert_eq!(stats.total, bronze.len());
    assert_eq!(stats.processed, bronze.len());
    assert_eq!(stats.written, 0);
    assert_eq!(stats.errors, 0);
    assert!(silver_keys(&blobs).await.is_empty());
    Ok(())
}

#[tokio::test]
async fn backfill_writes_one_silver_object_per_bronze_object() -> Result<()> {
    // ---
    let (blobs, store) = setup();
    let now = Utc::now();
    let bronze = seed_bronze(&store, now).await?;

    let (start, end) = range_for_days(2, now);
    let stats = backfill(&store, start, end, false).await?;

    assert_eq!(stats.written, bronze.len());
    assert!(stats.is_clean());

    let bronze_names: Vec<String> = blobs
        .keys()
        .await
        .into_iter()
        .filter_map(|k| k.strip_prefix("samples/").map(String::from))
        .collect();
    let silver_names: Vec<String> = silver_keys(&blobs)
        .await
        .into_iter()
        .filter_map(|k| k.strip_prefix("silver/").map(String::from))
        .collect();
    assert_eq!(bronze_names, silver_names);

    // Rerunning overwrites in place
    backfill(&store, start, end, false).await?;
    assert_eq!(silver_keys(&blobs).await.len(), bronze.len());
    Ok(())
}

#[tokio::test]
async fn backfill_matches_unthrottled_live_enrichment() -> Result<()> {
    // ---
    let (_, store) = setup();
    let now = Utc::now();
    let bronze = seed_bronze(&store, now).await?;

    let (start, end) = range_for_days(2, now);
    backfill(&store, start, end, false).await?;

    let silver: Vec<EnrichedReading> = store.list_window(Layer::Silver, start, end).await?;
    assert_eq!(silver.len(), bronze.len());

    // Readings whose 7h lookback lies fully inside the seeded range
    for raw in bronze.iter().filter(|r| r.timestamp >= now - Duration::hours(32)) {
        let live = enrich_fresh(&store, raw, raw.timestamp).await;
        let recomputed = silver
            .iter()
            .find(|s| s.raw.timestamp == raw.timestamp)
            .expect("silver record for every bronze reading");
        assert_eq!(&live, recomputed, "divergence at {}", raw.timestamp);
    }

    // Trend is populated once 3h of history exists
    let last = silver.last().unwrap();
    assert!(last.trend.pressure_trend_3h.is_some());
    assert!(last.trend.pressure_trend_6h.is_some());
    Ok(())
}

#[tokio::test]
async fn malformed_bronze_objects_are_skipped() -> Result<()> {
    // ---
    let (blobs, store) = setup();
    let now = Utc::now();
    let bronze = seed_bronze(&store, now).await?;

    let broken_key = format!("samples/{}/garbage.json", now.format("%Y-%m-%d"));
    blobs.put(&broken_key, b"{\"ts\": 12".to_vec()).await?;

    let (start, end) = range_for_days(2, now);
    let stats = backfill(&store, start, end, true).await?;
    assert_eq!(stats.total, bronze.len());
    assert_eq!(stats.errors, 0);
    Ok(())
}

#[tokio::test]
async fn write_failures_are_counted_not_fatal() -> Result<()> {
    // ---
    let (blobs, store) = setup();
    let now = Utc::now();
    let bronze = seed_bronze(&store, now).await?;
    blobs.fail_prefix("silver/").await;

    let (start, end) = range_for_days(2, now);
    let stats = backfill(&store, start, end, false).await?;

    assert_eq!(stats.processed, bronze.len());
    assert_eq!(stats.written, 0);
    assert_eq!(stats.errors, bronze.len());
    assert!(!stats.is_clean());
    Ok(())
}

#[tokio::test]
async fn unreachable_store_aborts() -> Result<()> {
    // ---
    let (blobs, store) = setup();
    blobs.set_offline(true);

    let (start, end) = range_for_days(1, Utc::now());
    let result = backfill(&store, start, end, true).await;
    assert!(matches!(result, Err(WeatherError::StoreUnavailable(_))));
    Ok(())
}

#[tokio::test]
async fn empty_range_reports_zero() -> Result<()> {
    // ---
    let (_, store) = setup();
    let (start, end) = range_for_days(3, Utc::now());
    let stats = backfill(&store, start, end, false).await?;
    assert_eq!(stats, Default::default());
    Ok(())
}
