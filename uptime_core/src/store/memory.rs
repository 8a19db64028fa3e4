//! In-memory record store

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use super::RecordStore;
use crate::error::{AppError, Result};

type Collection = BTreeMap<String, Value>;

#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|c| c.get(collection).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

fn not_found(collection: &str, key: &str) -> AppError {
    AppError::NotFound(format!("{}/{}", collection, key))
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn create(&self, collection: &str, key: &str, record: &Value) -> Result<()> {
        let mut collections = self.collections.write()
            .map_err(|_| AppError::InternalServerError)?;

        let entries = collections.entry(collection.to_string()).or_default();
        if entries.contains_key(key) {
            return Err(AppError::AlreadyExists(format!("{}/{}", collection, key)));
        }

        entries.insert(key.to_string(), record.clone());
        Ok(())
    }

    async fn read(&self, collection: &str, key: &str) -> Result<Value> {
        let collections = self.collections.read()
            .map_err(|_| AppError::InternalServerError)?;

        collections
            .get(collection)
            .and_then(|entries| entries.get(key))
            .cloned()
            .ok_or_else(|| not_found(collection, key))
    }

    async fn update(&self, collection: &str, key: &str, record: &Value) -> Result<()> {
        let mut collections = self.collections.write()
            .map_err(|_| AppError::InternalServerError)?;

        let slot = collections
            .get_mut(collection)
            .and_then(|entries| entries.get_mut(key))
            .ok_or_else(|| not_found(collection, key))?;

        *slot = record.clone();
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<()> {
        let mut collections = self.collections.write()
            .map_err(|_| AppError::InternalServerError)?;

        collections
            .get_mut(collection)
            .and_then(|entries| entries.remove(key))
            .map(|_| ())
            .ok_or_else(|| not_found(collection, key))
    }

    async fn list(&self, collection: &str) -> Result<Vec<String>> {
        let collections = self.collections.read()
            .map_err(|_| AppError::InternalServerError)?;

        Ok(collections
            .get(collection)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default())
    }
}
