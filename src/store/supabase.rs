use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, error, instrument};

use super::{Order, Store, UploadOptions};
use crate::config::AppConfig;
use crate::error::StoreError;

/// REST client for a Supabase project (PostgREST tables and the Storage API).
#[derive(Clone, Debug)]
pub struct SupabaseStore {
    base_url: String,
    anon_key: String,
    http: Client,
}

impl SupabaseStore {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, anon_key: anon_key.into(), http: Client::new() }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.store_url.clone(), config.store_anon_key.clone())
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path.trim_start_matches('/'))
    }

    fn order_param(order: &Order) -> String {
        format!("{}.{}", order.column, if order.ascending { "asc" } else { "desc" })
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.anon_key).bearer_auth(&self.anon_key)
    }

    async fn send(req: RequestBuilder) -> Result<Response, StoreError> {
        let resp = req.send().await.map_err(|e| {
            error!(target: "question_forge::store", error = %e, "HTTP request failed");
            StoreError::Http(e.to_string())
        })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or(body);
        error!(target: "question_forge::store", status = %status, error = %message, "store returned an error");
        Err(StoreError::Api { status: status.as_u16(), message })
    }

    async fn json_rows(resp: Response) -> Result<Vec<Value>, StoreError> {
        resp.json::<Vec<Value>>().await.map_err(|e| StoreError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Store for SupabaseStore {
    #[instrument(target = "question_forge::store", skip(self))]
    async fn select(&self, table: &str, columns: &str, order: Option<Order>) -> Result<Vec<Value>, StoreError> {
        let mut query = vec![("select", columns.to_string())];
        if let Some(order) = &order {
            query.push(("order", Self::order_param(order)));
        }

        let req = self.authed(self.http.get(self.table_url(table))).query(&query);
        let rows = Self::json_rows(Self::send(req).await?).await?;
        debug!(target: "question_forge::store", table, rows = rows.len(), "select completed");
        Ok(rows)
    }

    #[instrument(target = "question_forge::store", skip(self, rows), fields(rows = rows.len()))]
    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>, StoreError> {
        let req = self
            .authed(self.http.post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(&rows);
        Self::json_rows(Self::send(req).await?).await
    }

    #[instrument(target = "question_forge::store", skip(self, bytes, options), fields(bytes = bytes.len()))]
    async fn upload(&self, bucket: &str, path: &str, bytes: Bytes, options: UploadOptions) -> Result<(), StoreError> {
        let req = self
            .authed(self.http.post(self.object_url(bucket, path)))
            .header("content-type", options.content_type)
            .header("cache-control", format!("max-age={}", options.cache_control))
            .header("x-upsert", options.upsert.to_string())
            .body(bytes);
        Self::send(req).await?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, bucket, path.trim_start_matches('/'))
    }

    #[instrument(target = "question_forge::store", skip(self))]
    async fn remove(&self, bucket: &str, paths: Vec<String>) -> Result<(), StoreError> {
        let url = format!("{}/storage/v1/object/{}", self.base_url, bucket);
        let req = self
            .authed(self.http.delete(url))
            .json(&serde_json::json!({ "prefixes": paths }));
        Self::send(req).await?;
        Ok(())
    }
}
