//! Filesystem bucket: each key maps to a file under the root directory, with
//! `/` in the key becoming a directory separator.

use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;

use super::blob::{BlobStore, ObjectMeta};
use crate::error::{WeatherError, WeatherResult};

// ---

/// Per-process sequence for temp file names.
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    // ---
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalBlobStore { root: root.into() }
    }

    fn path_for(&self, key: &str) -> WeatherResult<PathBuf> {
        // ---
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(WeatherError::InvalidInput(format!("illegal object key '{key}'")));
        }
        Ok(self.root.join(relative))
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        // ---
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    // ---
    async fn put(&self, key: &str, body: Vec<u8>) -> WeatherResult<()> {
        // ---
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write-then-rename so readers never observe a half-written object.
        // Each call gets its own temp name.
        let mut tmp = path.clone().into_os_string();
        tmp.push(tmp_suffix());
        fs::write(&tmp, body).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> WeatherResult<Vec<u8>> {
        // ---
        let path = self.path_for(key)?;
        fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => WeatherError::NotFound(key.to_string()),
            _ => WeatherError::StoreUnavailable(format!("{key}: {e}")),
        })
    }

    async fn list(&self, prefix: &str) -> WeatherResult<Vec<ObjectMeta>> {
        // ---
        // Start the walk at the deepest directory the prefix names
        let base = match prefix.rfind('/') {
            Some(pos) => self.path_for(&prefix[..pos])?,
            None => self.root.clone(),
        };

        let mut objects = Vec::new();
        let mut pending = vec![base];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(WeatherError::StoreUnavailable(format!(
                        "listing {}: {e}",
                        dir.display()
                    )))
                }
            };

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let metadata = entry.metadata().await?;
                if metadata.is_dir() {
                    pending.push(path);
                    continue;
                }

                let Some(key) = self.key_for(&path) else {
                    continue;
                };
                if !key.starts_with(prefix) || key.ends_with(".tmp") {
                    continue;
                }

                let last_modified = metadata
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now());
                objects.push(ObjectMeta {
                    key,
                    last_modified,
                    size: metadata.len(),
                });
            }
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }
}

fn tmp_suffix() -> String {
    format!(".{}.{}.tmp", std::process::id(), TMP_SEQ.fetch_add(1, Ordering::Relaxed))
}
