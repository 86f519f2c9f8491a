// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! A request is written with one upsert, so a store failure never leaves part of it behind

use crate::common::{test_service, TEST_DIM};
use async_trait::async_trait;
use semantic_search_node::ingestion::{ingest_items, IngestError};
use semantic_search_node::vectorstore::{
    ensure_collections, CollectionKind, CollectionSchema, MemoryStore, MetricType, SearchHit,
    SearchRequest, StoreResult, VectorRecord, VectorStore, VectorStoreError,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Memory store whose `fail_on`-th upsert (1-based) returns a connection error
struct FailingStore {
    inner: MemoryStore,
    upserts: AtomicUsize,
    fail_on: usize,
    texts: Mutex<Vec<Option<String>>>,
}

impl FailingStore {
    fn new(fail_on: usize) -> Self {
        Self {
            inner: MemoryStore::new(MetricType::L2),
            upserts: AtomicUsize::new(0),
            fail_on,
            texts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VectorStore for FailingStore {
    async fn has_collection(&self, name: &str) -> StoreResult<bool> {
        self.inner.has_collection(name).await
    }

    async fn create_collection(&self, schema: &CollectionSchema) -> StoreResult<()> {
        self.inner.create_collection(schema).await
    }

    async fn drop_collection(&self, name: &str) -> StoreResult<()> {
        self.inner.drop_collection(name).await
    }

    async fn upsert(
        &self,
        schema: &CollectionSchema,
        records: &[VectorRecord],
    ) -> StoreResult<usize> {
        let n = self.upserts.fetch_add(1, Ordering::SeqCst) + 1;
        self.texts
            .lock()
            .unwrap()
            .extend(records.iter().map(|r| r.text.clone()));
        if n == self.fail_on {
            return Err(VectorStoreError::Connection("connection reset".to_string()));
        }
        self.inner.upsert(schema, records).await
    }

    async fn search(
        &self,
        schema: &CollectionSchema,
        vector: &[f32],
        request: &SearchRequest,
    ) -> StoreResult<Vec<SearchHit>> {
        self.inner.search(schema, vector, request).await
    }

    async fn hybrid_search(
        &self,
        schema: &CollectionSchema,
        vector: &[f32],
        query_text: &str,
        request: &SearchRequest,
    ) -> StoreResult<Vec<SearchHit>> {
        self.inner
            .hybrid_search(schema, vector, query_text, request)
            .await
    }
}

fn services_items(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| {
            json!({
                "service_id": format!("svc-{}", i),
                "url": format!("https://bank.example/services/{}", i),
                "name": "Savings account",
                "description": format!("Open a savings account, offer {}", i),
                "intent_entity": "account_opening-savings"
            })
        })
        .collect()
}

async fn prepared(store: &FailingStore) -> CollectionSchema {
    prepared_with(store, false).await
}

async fn prepared_with(store: &FailingStore, hybrid: bool) -> CollectionSchema {
    let schema =
        CollectionSchema::new("services", CollectionKind::Services, TEST_DIM).with_hybrid(hybrid);
    ensure_collections(store, std::slice::from_ref(&schema))
        .await
        .unwrap();
    schema
}

#[tokio::test]
async fn test_large_request_is_one_upsert() {
    let store = FailingStore::new(2);
    let schema = prepared(&store).await;

    let report = ingest_items(Arc::new(test_service()), &store, &schema, services_items(120))
        .await
        .unwrap();

    assert_eq!(report.ingested, 120);
    assert_eq!(store.upserts.load(Ordering::SeqCst), 1);
    assert_eq!(store.inner.count("services").await, Some(120));
}

#[tokio::test]
async fn test_failed_upsert_writes_nothing() {
    let store = FailingStore::new(1);
    let schema = prepared(&store).await;

    let result = ingest_items(Arc::new(test_service()), &store, &schema, services_items(120)).await;

    assert!(matches!(
        result,
        Err(IngestError::Store(VectorStoreError::Connection(_)))
    ));
    assert_eq!(store.inner.count("services").await, Some(0));
}

#[tokio::test]
async fn test_invalid_item_never_reaches_store() {
    let store = FailingStore::new(0);
    let schema = prepared(&store).await;
    let mut items = services_items(60);
    items[55] = json!({"service_id": "svc-broken", "url": "u"});

    let result = ingest_items(Arc::new(test_service()), &store, &schema, items).await;

    assert!(matches!(result, Err(IngestError::InvalidItem { index: 55, .. })));
    assert_eq!(store.upserts.load(Ordering::SeqCst), 0);
    assert_eq!(store.inner.count("services").await, Some(0));
}

#[tokio::test]
async fn test_hybrid_collection_stores_embedded_text() {
    let store = FailingStore::new(0);
    let schema = prepared_with(&store, true).await;

    ingest_items(Arc::new(test_service()), &store, &schema, services_items(2))
        .await
        .unwrap();

    let texts = store.texts.lock().unwrap().clone();
    assert_eq!(
        texts[1].as_deref(),
        Some("Savings account\nOpen a savings account, offer 1\naccount_opening-savings")
    );
}

#[tokio::test]
async fn test_dense_collection_omits_text() {
    let store = FailingStore::new(0);
    let schema = prepared(&store).await;

    ingest_items(Arc::new(test_service()), &store, &schema, services_items(2))
        .await
        .unwrap();

    assert!(store.texts.lock().unwrap().iter().all(Option::is_none));
}
