use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::fs;
use tokio::sync::Mutex;

use caltrack_core::error::{Result, TrackerError};
use caltrack_core::store::KeyValueStore;

/// File-backed key-value store: one JSON object mapping record names to
/// their serialized values, rewritten whole on every set/remove.
///
/// Clones share one lock, so writes to the store are serialized in call
/// order — the ordering assumption the state layer relies on.
#[derive(Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Arc::new(Mutex::new(())),
        }
    }

    async fn read_all(&self, key: &str) -> Result<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path).await {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| TrackerError::StorageRead {
                key: key.to_string(),
                message: format!("corrupt store file {}: {e}", self.path.display()),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(TrackerError::StorageRead {
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }

    async fn write_all(&self, key: &str, map: &BTreeMap<String, String>) -> Result<()> {
        let raw = serde_json::to_string_pretty(map)?;
        fs::write(&self.path, raw)
            .await
            .map_err(|e| TrackerError::StorageWrite {
                key: key.to_string(),
                message: e.to_string(),
            })
    }
}

impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().await;
        let map = self.read_all(key).await?;
        Ok(map.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_all(key).await?;
        map.insert(key.to_string(), value.to_string());
        self.write_all(key, &map).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_all(key).await?;
        if map.remove(key).is_some() {
            self.write_all(key, &map).await?;
        }
        Ok(())
    }
}
