//! Opaque remote store: table select/insert plus object storage upload, public URL and remove.

pub mod memory;
pub mod supabase;

pub use memory::{MemoryStore, StoreCall, StoreOp};
pub use supabase::SupabaseStore;

use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    pub fn asc(column: impl Into<String>) -> Self {
        Self { column: column.into(), ascending: true }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self { column: column.into(), ascending: false }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    pub content_type: String,
    /// Seconds.
    pub cache_control: u32,
    pub upsert: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self { content_type: "application/octet-stream".to_string(), cache_control: 3600, upsert: false }
    }
}

#[async_trait]
pub trait Store: Send + Sync + Debug {
    async fn select(&self, table: &str, columns: &str, order: Option<Order>) -> Result<Vec<Value>, StoreError>;

    /// Insert rows and return them as stored.
    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>, StoreError>;

    async fn upload(&self, bucket: &str, path: &str, bytes: Bytes, options: UploadOptions) -> Result<(), StoreError>;

    /// Public URL of an object. Does not check that the object exists.
    fn public_url(&self, bucket: &str, path: &str) -> String;

    async fn remove(&self, bucket: &str, paths: Vec<String>) -> Result<(), StoreError>;
}
