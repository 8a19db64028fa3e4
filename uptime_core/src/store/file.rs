//! JSON file record store laid out as `<root>/<collection>/<key>.json`

use async_trait::async_trait;
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, MutexGuard};

use super::RecordStore;
use crate::error::{AppError, Result};

const LOCK_SHARDS: usize = 64;

#[derive(Clone, Debug)]
pub struct FileRecordStore {
    root: PathBuf,
    // Update and delete of one key hold the same shard for their whole duration.
    locks: Arc<Vec<Mutex<()>>>,
}

impl FileRecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Arc::new((0..LOCK_SHARDS).map(|_| Mutex::new(())).collect()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn lock_key(&self, collection: &str, key: &str) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        (collection, key).hash(&mut hasher);
        self.locks[(hasher.finish() as usize) % self.locks.len()].lock().await
    }

    fn collection_dir(&self, collection: &str) -> Result<PathBuf> {
        check_segment(collection)?;
        Ok(self.root.join(collection))
    }

    fn record_path(&self, collection: &str, key: &str) -> Result<PathBuf> {
        check_segment(key)?;
        Ok(self.collection_dir(collection)?.join(format!("{}.json", key)))
    }
}

fn check_segment(segment: &str) -> Result<()> {
    if segment.is_empty()
        || segment.starts_with('.')
        || segment.contains(['/', '\\'])
    {
        return Err(AppError::Persistence(format!("invalid record key '{}'", segment)));
    }
    Ok(())
}

fn map_missing(err: std::io::Error, collection: &str, key: &str) -> AppError {
    if err.kind() == ErrorKind::NotFound {
        AppError::NotFound(format!("{}/{}", collection, key))
    } else {
        AppError::IoError(err)
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn create(&self, collection: &str, key: &str, record: &Value) -> Result<()> {
        let path = self.record_path(collection, key)?;
        fs::create_dir_all(self.collection_dir(collection)?).await?;

        let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(AppError::AlreadyExists(format!("{}/{}", collection, key)));
            }
            Err(e) => return Err(e.into()),
        };

        file.write_all(&serde_json::to_vec(record)?).await?;
        file.sync_all().await?;
        Ok(())
    }

    async fn read(&self, collection: &str, key: &str) -> Result<Value> {
        let path = self.record_path(collection, key)?;
        let contents = fs::read(&path)
            .await
            .map_err(|e| map_missing(e, collection, key))?;
        Ok(serde_json::from_slice(&contents)?)
    }

    async fn update(&self, collection: &str, key: &str, record: &Value) -> Result<()> {
        let path = self.record_path(collection, key)?;
        let dir = self.collection_dir(collection)?;
        let contents = serde_json::to_vec(record)?;

        let _guard = self.lock_key(collection, key).await;
        fs::metadata(&path)
            .await
            .map_err(|e| map_missing(e, collection, key))?;

        // Each call stages its own file and renames it over the record so readers never see a partial file.
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut staging = tempfile::NamedTempFile::new_in(&dir)?;
            staging.write_all(&contents)?;
            staging.as_file().sync_all()?;
            staging.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Persistence(format!("update of {}/{} was interrupted: {}", collection, key, e)))??;
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<()> {
        let path = self.record_path(collection, key)?;
        let _guard = self.lock_key(collection, key).await;
        fs::remove_file(&path)
            .await
            .map_err(|e| map_missing(e, collection, key))
    }

    async fn list(&self, collection: &str) -> Result<Vec<String>> {
        let dir = self.collection_dir(collection)?;
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(key) = name.to_str().and_then(|n| n.strip_suffix(".json")) {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}
