//! Keyed record storage grouped into named collections

pub mod file;
pub mod memory;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub use file::FileRecordStore;
pub use memory::MemoryRecordStore;

/// Flat record storage. Missing keys surface as `AppError::NotFound` and
/// duplicate creates as `AppError::AlreadyExists`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create(&self, collection: &str, key: &str, record: &Value) -> Result<()>;
    async fn read(&self, collection: &str, key: &str) -> Result<Value>;
    async fn update(&self, collection: &str, key: &str, record: &Value) -> Result<()>;
    async fn delete(&self, collection: &str, key: &str) -> Result<()>;
    async fn list(&self, collection: &str) -> Result<Vec<String>>;
}
