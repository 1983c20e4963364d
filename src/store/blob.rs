use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::WeatherResult;

// ---

/// Listing entry for a stored object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectMeta {
    pub key: String,
    pub last_modified: DateTime<Utc>,
    pub size: u64,
}

/// Key/value blob store with list-by-prefix.
///
/// Writes replace any existing object under the same key. Transport failures
/// surface as [`crate::WeatherError::StoreUnavailable`]; a missing key as
/// [`crate::WeatherError::NotFound`].
#[async_trait]
pub trait BlobStore: Send + Sync {
    // ---
    async fn put(&self, key: &str, body: Vec<u8>) -> WeatherResult<()>;

    async fn get(&self, key: &str) -> WeatherResult<Vec<u8>>;

    /// Every object whose key starts with `prefix`, sorted by key.
    async fn list(&self, prefix: &str) -> WeatherResult<Vec<ObjectMeta>>;
}
