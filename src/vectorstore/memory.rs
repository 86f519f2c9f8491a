// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-memory vector store
//!
//! Exact scan over every row of a collection. Same paging, filtering and
//! projection rules as the Milvus backend.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::debug;

use super::error::{StoreResult, VectorStoreError};
use super::filter::matches_filter;
use super::schema::{CollectionSchema, MetricType, SearchHit, SearchRequest, VectorRecord};
use super::{check_dimension, VectorStore};

#[derive(Debug)]
struct MemoryCollection {
    schema: CollectionSchema,
    /// Rows keyed by primary key
    rows: BTreeMap<String, VectorRecord>,
}

/// Process-local store, lost on restart
#[derive(Debug)]
pub struct MemoryStore {
    metric: MetricType,
    collections: RwLock<HashMap<String, MemoryCollection>>,
}

impl MemoryStore {
    pub fn new(metric: MetricType) -> Self {
        Self {
            metric,
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Row count of `name`, or `None` if the collection does not exist
    pub async fn count(&self, name: &str) -> Option<usize> {
        self.collections
            .read()
            .await
            .get(name)
            .map(|c| c.rows.len())
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn has_collection(&self, name: &str) -> StoreResult<bool> {
        Ok(self.collections.read().await.contains_key(name))
    }

    async fn create_collection(&self, schema: &CollectionSchema) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        collections
            .entry(schema.name.clone())
            .or_insert_with(|| MemoryCollection {
                schema: schema.clone(),
                rows: BTreeMap::new(),
            });
        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> StoreResult<()> {
        self.collections.write().await.remove(name);
        Ok(())
    }

    async fn upsert(
        &self,
        schema: &CollectionSchema,
        records: &[VectorRecord],
    ) -> StoreResult<usize> {
        for record in records {
            check_dimension(schema, &record.embedding)?;
            record.validate(schema.kind)?;
        }

        let mut collections = self.collections.write().await;
        let collection = collections
            .get_mut(&schema.name)
            .ok_or_else(|| VectorStoreError::UnknownCollection(schema.name.clone()))?;
        for record in records {
            collection.rows.insert(record.id.clone(), record.clone());
        }
        debug!(
            "Upserted {} rows into '{}' ({} total)",
            records.len(),
            schema.name,
            collection.rows.len()
        );
        Ok(records.len())
    }

    async fn search(
        &self,
        schema: &CollectionSchema,
        vector: &[f32],
        request: &SearchRequest,
    ) -> StoreResult<Vec<SearchHit>> {
        request.validate()?;
        check_dimension(schema, vector)?;

        let collections = self.collections.read().await;
        let collection = collections
            .get(&schema.name)
            .ok_or_else(|| VectorStoreError::UnknownCollection(schema.name.clone()))?;
        let kind = collection.schema.kind;
        let empty = Map::new();
        let filter = request.metadata_filter.as_ref().unwrap_or(&empty);

        let mut scored = Vec::new();
        for record in collection.rows.values() {
            let row = match record.to_row(kind) {
                Value::Object(map) => map,
                _ => continue,
            };
            if !matches_filter(filter, &row)? {
                continue;
            }
            scored.push((self.metric.score(vector, &record.embedding), row));
        }

        let higher_is_closer = self.metric.higher_is_closer();
        scored.sort_by(|a, b| {
            let ord = a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal);
            if higher_is_closer {
                ord.reverse()
            } else {
                ord
            }
        });

        let output_fields = request.resolved_output_fields(kind);
        Ok(scored
            .into_iter()
            .skip(request.offset())
            .take(request.page_size)
            .map(|(distance, row)| SearchHit {
                distance,
                fields: output_fields
                    .iter()
                    .filter_map(|f| row.get(f).map(|v| (f.clone(), v.clone())))
                    .collect(),
            })
            .collect())
    }

    async fn hybrid_search(
        &self,
        schema: &CollectionSchema,
        _vector: &[f32],
        _query_text: &str,
        _request: &SearchRequest,
    ) -> StoreResult<Vec<SearchHit>> {
        Err(VectorStoreError::InvalidRequest(format!(
            "hybrid search on '{}' needs the Milvus backend; the memory store has no BM25 index",
            schema.name
        )))
    }
}
