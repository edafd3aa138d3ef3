use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use super::{Order, Store, UploadOptions};
use crate::error::StoreError;

const PUBLIC_BASE: &str = "https://memory.store/storage/v1/object/public";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Select,
    Insert,
    Upload,
    Remove,
}

/// One call received by a `MemoryStore`.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Select { table: String, columns: String, order: Option<Order> },
    Insert { table: String, rows: Vec<Value> },
    Upload { bucket: String, path: String, options: UploadOptions, len: usize },
    Remove { bucket: String, paths: Vec<String> },
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<String, Vec<Value>>,
    objects: HashMap<(String, String), Bytes>,
    calls: Vec<StoreCall>,
    failures: HashMap<(StoreOp, Option<String>), String>,
}

impl State {
    /// A failure registered for this op on this table/bucket, or for the op on any target.
    fn failure(&self, op: StoreOp, target: &str) -> Option<StoreError> {
        self.failures
            .get(&(op, Some(target.to_string())))
            .or_else(|| self.failures.get(&(op, None)))
            .map(|message| StoreError::Api { status: 500, message: message.clone() })
    }
}

/// In-process store that records every call. Cloning shares the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> Result<R, StoreError> {
        let mut state = self.state.lock().map_err(|_| StoreError::Http("memory store poisoned".to_string()))?;
        Ok(f(&mut state))
    }

    /// Seed a table with rows.
    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        let _ = self.with_state(|s| s.tables.entry(table.to_string()).or_default().extend(rows));
    }

    /// Make every `op` fail with `message`, optionally only for one table or bucket.
    pub fn fail(&self, op: StoreOp, target: Option<&str>, message: &str) {
        let _ = self.with_state(|s| s.failures.insert((op, target.map(str::to_string)), message.to_string()));
    }

    pub fn clear_failures(&self) {
        let _ = self.with_state(|s| s.failures.clear());
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.with_state(|s| s.calls.clone()).unwrap_or_default()
    }

    pub fn count(&self, op: StoreOp) -> usize {
        self.calls()
            .iter()
            .filter(|c| {
                matches!(
                    (op, c),
                    (StoreOp::Select, StoreCall::Select { .. })
                        | (StoreOp::Insert, StoreCall::Insert { .. })
                        | (StoreOp::Upload, StoreCall::Upload { .. })
                        | (StoreOp::Remove, StoreCall::Remove { .. })
                )
            })
            .count()
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.with_state(|s| s.tables.get(table).cloned().unwrap_or_default()).unwrap_or_default()
    }

    pub fn object(&self, bucket: &str, path: &str) -> Option<Bytes> {
        self.with_state(|s| s.objects.get(&(bucket.to_string(), path.to_string())).cloned()).ok().flatten()
    }

    pub fn object_count(&self) -> usize {
        self.with_state(|s| s.objects.len()).unwrap_or(0)
    }
}

fn sort_key(row: &Value, column: &str) -> String {
    match row.get(column) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn project(row: &Value, columns: &str) -> Value {
    if columns.trim() == "*" {
        return row.clone();
    }
    let mut out = serde_json::Map::new();
    for col in columns.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        if let Some(v) = row.get(col) {
            out.insert(col.to_string(), v.clone());
        }
    }
    Value::Object(out)
}

#[async_trait]
impl Store for MemoryStore {
    async fn select(&self, table: &str, columns: &str, order: Option<Order>) -> Result<Vec<Value>, StoreError> {
        self.with_state(|s| {
            s.calls.push(StoreCall::Select { table: table.to_string(), columns: columns.to_string(), order: order.clone() });
            if let Some(err) = s.failure(StoreOp::Select, table) {
                return Err(err);
            }

            let mut rows = s.tables.get(table).cloned().unwrap_or_default();
            if let Some(order) = &order {
                rows.sort_by_key(|r| sort_key(r, &order.column));
                if !order.ascending {
                    rows.reverse();
                }
            }
            Ok(rows.iter().map(|r| project(r, columns)).collect())
        })?
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>, StoreError> {
        self.with_state(|s| {
            s.calls.push(StoreCall::Insert { table: table.to_string(), rows: rows.clone() });
            if let Some(err) = s.failure(StoreOp::Insert, table) {
                return Err(err);
            }
            s.tables.entry(table.to_string()).or_default().extend(rows.iter().cloned());
            Ok(rows)
        })?
    }

    async fn upload(&self, bucket: &str, path: &str, bytes: Bytes, options: UploadOptions) -> Result<(), StoreError> {
        self.with_state(|s| {
            s.calls.push(StoreCall::Upload {
                bucket: bucket.to_string(),
                path: path.to_string(),
                options: options.clone(),
                len: bytes.len(),
            });
            if let Some(err) = s.failure(StoreOp::Upload, bucket) {
                return Err(err);
            }
            let key = (bucket.to_string(), path.to_string());
            if !options.upsert && s.objects.contains_key(&key) {
                return Err(StoreError::Api { status: 409, message: "The resource already exists".to_string() });
            }
            s.objects.insert(key, bytes);
            Ok(())
        })?
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/{}/{}", PUBLIC_BASE, bucket, path)
    }

    async fn remove(&self, bucket: &str, paths: Vec<String>) -> Result<(), StoreError> {
        self.with_state(|s| {
            s.calls.push(StoreCall::Remove { bucket: bucket.to_string(), paths: paths.clone() });
            if let Some(err) = s.failure(StoreOp::Remove, bucket) {
                return Err(err);
            }
            for p in paths {
                s.objects.remove(&(bucket.to_string(), p));
            }
            Ok(())
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn select_orders_and_projects() {
        let store = MemoryStore::new();
        store.seed("question_subjects", vec![
            json!({"id": "2", "label": "Physics", "extra": true}),
            json!({"id": "1", "label": "Algebra"}),
        ]);

        let rows = store.select("question_subjects", "id, label", Some(Order::asc("label"))).await.unwrap();
        assert_eq!(rows, vec![json!({"id": "1", "label": "Algebra"}), json!({"id": "2", "label": "Physics"})]);
    }

    #[tokio::test]
    async fn targeted_failures_only_hit_their_table() {
        let store = MemoryStore::new();
        store.fail(StoreOp::Select, Some("test_names"), "permission denied");

        assert!(store.select("test_names", "*", None).await.is_err());
        assert!(store.select("question_subjects", "*", None).await.is_ok());
        assert_eq!(store.count(StoreOp::Select), 2);
    }

    #[tokio::test]
    async fn upload_without_upsert_rejects_duplicates() {
        let store = MemoryStore::new();
        let opts = UploadOptions::default();
        store.upload("general", "a/b.png", Bytes::from_static(b"1"), opts.clone()).await.unwrap();
        let err = store.upload("general", "a/b.png", Bytes::from_static(b"2"), opts).await.unwrap_err();
        assert!(matches!(err, StoreError::Api { status: 409, .. }));
        assert_eq!(store.object("general", "a/b.png"), Some(Bytes::from_static(b"1")));
    }
}
