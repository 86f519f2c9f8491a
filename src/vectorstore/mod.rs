// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Vector store abstraction
//!
//! Indexing and ANN search happen inside the database. This module owns the
//! collection schemas, the filter expression language and two backends:
//! - [`MilvusStore`]: Milvus REST v2 over `reqwest`
//! - [`MemoryStore`]: exact scan, for tests and small deployments

pub mod error;
pub mod filter;
pub mod memory;
pub mod milvus;
pub mod schema;

use async_trait::async_trait;
use tracing::info;

pub use error::{StoreResult, VectorStoreError};
pub use filter::{matches_filter, render_filter};
pub use memory::MemoryStore;
pub use milvus::{MilvusConfig, MilvusStore, RRF_K};
pub use schema::{
    CollectionKind, CollectionSchema, FieldSpec, IndexType, MetricType, SearchHit, SearchRequest,
    VectorRecord, MAX_PAGE_SIZE, MAX_RESULT_WINDOW, SPARSE_FIELD, TEXT_FIELD, VECTOR_FIELD,
};

/// Storage seam between the HTTP/ingestion layer and the database
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn has_collection(&self, name: &str) -> StoreResult<bool>;

    /// Creates the collection with its vector index and loads it for search
    async fn create_collection(&self, schema: &CollectionSchema) -> StoreResult<()>;

    async fn drop_collection(&self, name: &str) -> StoreResult<()>;

    /// Inserts or replaces `records` by primary key; returns how many were written
    async fn upsert(&self, schema: &CollectionSchema, records: &[VectorRecord])
        -> StoreResult<usize>;

    /// One page of nearest neighbours of `vector`
    async fn search(
        &self,
        schema: &CollectionSchema,
        vector: &[f32],
        request: &SearchRequest,
    ) -> StoreResult<Vec<SearchHit>>;

    /// Dense search on `vector` fused with BM25 on `query_text` (RRF)
    ///
    /// Only collections created with [`CollectionSchema::hybrid`] set support this.
    async fn hybrid_search(
        &self,
        schema: &CollectionSchema,
        vector: &[f32],
        query_text: &str,
        request: &SearchRequest,
    ) -> StoreResult<Vec<SearchHit>>;
}

/// Creates every collection in `schemas` that does not exist yet
///
/// Returns the names that were created.
pub async fn ensure_collections(
    store: &dyn VectorStore,
    schemas: &[CollectionSchema],
) -> StoreResult<Vec<String>> {
    let mut created = Vec::new();
    for schema in schemas {
        if store.has_collection(&schema.name).await? {
            info!("Collection '{}' already exists", schema.name);
            continue;
        }
        store.create_collection(schema).await?;
        info!(
            "Created collection '{}' ({}, {}D)",
            schema.name, schema.kind, schema.dimension
        );
        created.push(schema.name.clone());
    }
    Ok(created)
}

/// Checks a vector's length against the collection dimension
pub fn check_dimension(schema: &CollectionSchema, vector: &[f32]) -> StoreResult<()> {
    if vector.len() != schema.dimension {
        return Err(VectorStoreError::DimensionMismatch {
            expected: schema.dimension,
            actual: vector.len(),
        });
    }
    Ok(())
}
