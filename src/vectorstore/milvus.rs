// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Milvus REST v2 client
//!
//! Every call is a JSON `POST /v2/vectordb/...`. Milvus answers HTTP 200 with
//! `{"code": 0, "data": ...}` on success and a non-zero `code` plus `message`
//! otherwise.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, info};

use super::error::{StoreResult, VectorStoreError};
use super::filter::render_filter;
use super::schema::{
    CollectionSchema, IndexType, MetricType, SearchHit, SearchRequest, VectorRecord, SPARSE_FIELD,
    VECTOR_FIELD,
};

/// RRF smoothing constant for hybrid search
pub const RRF_K: u32 = 100;

/// Share of the smallest query-term weights ignored by the BM25 leg
const SPARSE_DROP_RATIO: f64 = 0.2;
use super::{check_dimension, VectorStore};

/// Connection and index settings for [`MilvusStore`]
#[derive(Debug, Clone)]
pub struct MilvusConfig {
    /// Base URI, e.g. `http://localhost:19530`
    pub uri: String,
    /// Sent as a bearer token when set
    pub token: Option<String>,
    pub index_type: IndexType,
    pub metric_type: MetricType,
    pub timeout: Duration,
}

impl MilvusConfig {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            token: None,
            index_type: IndexType::IvfFlat,
            metric_type: MetricType::L2,
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct MilvusStore {
    client: Client,
    config: MilvusConfig,
}

impl std::fmt::Debug for MilvusStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MilvusStore")
            .field("uri", &self.config.uri)
            .field("index_type", &self.config.index_type)
            .field("metric_type", &self.config.metric_type)
            .finish()
    }
}

impl MilvusStore {
    pub fn new(config: MilvusConfig) -> StoreResult<Self> {
        reqwest::Url::parse(&config.uri).map_err(|e| {
            VectorStoreError::Connection(format!("Invalid Milvus URI '{}': {}", config.uri, e))
        })?;

        let client = Client::builder().timeout(config.timeout).build()?;

        info!(
            "Milvus client configured for {} ({} / {})",
            config.uri, config.index_type, config.metric_type
        );
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v2/vectordb/{}", self.config.uri.trim_end_matches('/'), path)
    }

    async fn post(&self, path: &str, body: Value) -> StoreResult<Value> {
        let url = self.endpoint(path);
        debug!("POST {}", url);

        let mut request = self.client.post(&url).json(&body);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(VectorStoreError::Connection(format!(
                "{} returned HTTP {}: {}",
                path, status, text
            )));
        }

        let payload = response.json::<Value>().await.map_err(|e| {
            VectorStoreError::Connection(format!("{} returned invalid JSON: {}", path, e))
        })?;
        unwrap_envelope(payload)
    }

    /// Body for `entities/search`
    pub fn search_body(
        &self,
        schema: &CollectionSchema,
        vector: &[f32],
        request: &SearchRequest,
    ) -> StoreResult<Value> {
        let mut body = json!({
            "collectionName": schema.name,
            "data": [vector],
            "annsField": VECTOR_FIELD,
            "limit": request.page_size,
            "offset": request.offset(),
            "outputFields": request.resolved_output_fields(schema.kind),
            "searchParams": {
                "metricType": self.config.metric_type.as_str(),
                "params": request.resolved_search_params(self.config.index_type),
            },
        });
        if let Some(filter) = &request.metadata_filter {
            if let Some(expr) = render_filter(filter)? {
                body["filter"] = json!(expr);
            }
        }
        Ok(body)
    }

    /// Body for `entities/hybrid_search`: a dense and a BM25 leg fused by RRF
    ///
    /// Each leg fetches the whole window up to this page so the fused ranking
    /// is stable across pages.
    pub fn hybrid_search_body(
        &self,
        schema: &CollectionSchema,
        vector: &[f32],
        query_text: &str,
        request: &SearchRequest,
    ) -> StoreResult<Value> {
        let window = request.offset() + request.page_size;
        let mut dense = json!({
            "data": [vector],
            "annsField": VECTOR_FIELD,
            "limit": window,
            "params": {"params": request.resolved_search_params(self.config.index_type)},
        });
        let mut sparse = json!({
            "data": [query_text],
            "annsField": SPARSE_FIELD,
            "limit": window,
            "params": {"params": {"drop_ratio_search": SPARSE_DROP_RATIO}},
        });
        if let Some(filter) = &request.metadata_filter {
            if let Some(expr) = render_filter(filter)? {
                dense["filter"] = json!(expr);
                sparse["filter"] = json!(expr);
            }
        }
        Ok(json!({
            "collectionName": schema.name,
            "search": [dense, sparse],
            "rerank": {"strategy": "rrf", "params": {"k": RRF_K}},
            "limit": request.page_size,
            "offset": request.offset(),
            "outputFields": request.resolved_output_fields(schema.kind),
        }))
    }
}

/// Returns `data` for `code == 0`, otherwise a `Remote` error
fn unwrap_envelope(payload: Value) -> StoreResult<Value> {
    let code = payload.get("code").and_then(Value::as_i64).unwrap_or(0);
    if code != 0 {
        let message = payload
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("no message")
            .to_string();
        return Err(VectorStoreError::Remote { code, message });
    }
    Ok(payload.get("data").cloned().unwrap_or(Value::Null))
}

/// Turns one search result row into a hit, keeping only `output_fields`
fn parse_hit(row: &Value, output_fields: &[String]) -> Option<SearchHit> {
    let obj = row.as_object()?;
    let distance = obj.get("distance").and_then(Value::as_f64)? as f32;
    let fields: Map<String, Value> = output_fields
        .iter()
        .filter_map(|f| obj.get(f).map(|v| (f.clone(), v.clone())))
        .collect();
    Some(SearchHit { distance, fields })
}

#[async_trait]
impl VectorStore for MilvusStore {
    async fn has_collection(&self, name: &str) -> StoreResult<bool> {
        let data = self
            .post("collections/has", json!({"collectionName": name}))
            .await?;
        Ok(data.get("has").and_then(Value::as_bool).unwrap_or(false))
    }

    async fn create_collection(&self, schema: &CollectionSchema) -> StoreResult<()> {
        let body = schema.milvus_create_body(self.config.index_type, self.config.metric_type);
        self.post("collections/create", body).await?;
        self.post("collections/load", json!({"collectionName": schema.name}))
            .await?;
        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> StoreResult<()> {
        self.post("collections/drop", json!({"collectionName": name}))
            .await?;
        info!("Dropped collection '{}'", name);
        Ok(())
    }

    async fn upsert(
        &self,
        schema: &CollectionSchema,
        records: &[VectorRecord],
    ) -> StoreResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        for record in records {
            check_dimension(schema, &record.embedding)?;
            record.validate(schema.kind)?;
        }
        let rows: Vec<Value> = records.iter().map(|r| r.to_row(schema.kind)).collect();
        let data = self
            .post(
                "entities/upsert",
                json!({"collectionName": schema.name, "data": rows}),
            )
            .await?;
        let count = data
            .get("upsertCount")
            .and_then(Value::as_u64)
            .map(|c| c as usize)
            .unwrap_or(records.len());
        debug!("Upserted {} rows into '{}'", count, schema.name);
        Ok(count)
    }

    async fn search(
        &self,
        schema: &CollectionSchema,
        vector: &[f32],
        request: &SearchRequest,
    ) -> StoreResult<Vec<SearchHit>> {
        request.validate()?;
        check_dimension(schema, vector)?;

        let body = self.search_body(schema, vector, request)?;
        let data = self.post("entities/search", body).await?;

        let output_fields = request.resolved_output_fields(schema.kind);
        let rows = data.as_array().cloned().unwrap_or_default();
        Ok(rows
            .iter()
            .filter_map(|row| parse_hit(row, &output_fields))
            .collect())
    }

    async fn hybrid_search(
        &self,
        schema: &CollectionSchema,
        vector: &[f32],
        query_text: &str,
        request: &SearchRequest,
    ) -> StoreResult<Vec<SearchHit>> {
        if !schema.hybrid {
            return Err(VectorStoreError::InvalidRequest(format!(
                "collection '{}' has no BM25 text field; recreate it with hybrid search enabled",
                schema.name
            )));
        }
        request.validate()?;
        check_dimension(schema, vector)?;

        let body = self.hybrid_search_body(schema, vector, query_text, request)?;
        let data = self.post("entities/hybrid_search", body).await?;

        let output_fields = request.resolved_output_fields(schema.kind);
        let rows = data.as_array().cloned().unwrap_or_default();
        Ok(rows
            .iter()
            .filter_map(|row| parse_hit(row, &output_fields))
            .collect())
    }
}
