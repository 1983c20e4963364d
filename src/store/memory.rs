use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::blob::{BlobStore, ObjectMeta};
use crate::error::{WeatherError, WeatherResult};

// ---

#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    last_modified: DateTime<Utc>,
}

/// Bucket kept in process memory.
///
/// Supports fault injection: [`MemoryBlobStore::set_offline`] fails every call,
/// [`MemoryBlobStore::fail_prefix`] fails every call under a prefix.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    failing_prefixes: RwLock<HashSet<String>>,
    offline: AtomicBool,
}

impl MemoryBlobStore {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub async fn fail_prefix(&self, prefix: impl Into<String>) {
        self.failing_prefixes.write().await.insert(prefix.into());
    }

    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    async fn check(&self, key_or_prefix: &str) -> WeatherResult<()> {
        // ---
        if self.offline.load(Ordering::SeqCst) {
            return Err(WeatherError::StoreUnavailable("memory store offline".into()));
        }
        let failing = self.failing_prefixes.read().await;
        if failing.iter().any(|p| key_or_prefix.starts_with(p.as_str())) {
            return Err(WeatherError::StoreUnavailable(format!(
                "injected failure for {key_or_prefix}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    // ---
    async fn put(&self, key: &str, body: Vec<u8>) -> WeatherResult<()> {
        // ---
        self.check(key).await?;
        let object = StoredObject {
            body,
            last_modified: Utc::now(),
        };
        self.objects.write().await.insert(key.to_string(), object);
        Ok(())
    }

    async fn get(&self, key: &str) -> WeatherResult<Vec<u8>> {
        // ---
        self.check(key).await?;
        self.objects
            .read()
            .await
            .get(key)
            .map(|o| o.body.clone())
            .ok_or_else(|| WeatherError::NotFound(key.to_string()))
    }

    async fn list(&self, prefix: &str) -> WeatherResult<Vec<ObjectMeta>> {
        // ---
        self.check(prefix).await?;
        let objects = self.objects.read().await;
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, o)| ObjectMeta {
                key: key.clone(),
                last_modified: o.last_modified,
                size: o.body.len() as u64,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn injected_failures_only_hit_their_prefix() {
        // ---
        let store = MemoryBlobStore::new();
        tokio_test::block_on(async {
            store.put("samples/2025-10-06/a.json", b"{}".to_vec()).await.unwrap();
            store.fail_prefix("silver/").await;

            assert!(store.put("silver/2025-10-06/a.json", b"{}".to_vec()).await.is_err());
            assert_eq!(store.list("samples/").await.unwrap().len(), 1);
            assert_eq!(store.keys().await, vec!["samples/2025-10-06/a.json"]);
        });
    }

    #[test]
    fn offline_store_rejects_everything() {
        // ---
        let store = MemoryBlobStore::new();
        store.set_offline(true);
        tokio_test::block_on(async {
            let err = store.list("samples/").await.unwrap_err();
            assert!(matches!(err, WeatherError::StoreUnavailable(_)));
            assert!(store.get("samples/x.json").await.is_err());
        });
        store.set_offline(false);
        assert!(tokio_test::block_on(store.list("samples/")).unwrap().is_empty());
    }
}
