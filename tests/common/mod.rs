// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Shared fixtures: a word-level tokenizer and a fake encoder whose hidden
//! state for a token depends only on that token's id.

#![allow(dead_code)]

use ndarray::Array3;
use semantic_search_node::api::AppState;
use semantic_search_node::config::Settings;
use semantic_search_node::embeddings::{
    EmbeddingConfig, EmbeddingResult, EmbeddingService, ExecutionBackend, HiddenStateRunner,
    ModelHandle, TextTokenizer, TokenBatch,
};
use semantic_search_node::vectorstore::{MemoryStore, MetricType};
use std::path::PathBuf;
use std::sync::Arc;

pub const TEST_DIM: usize = 16;
pub const TEST_MAX_LENGTH: usize = 32;

pub const VOCAB_JSON: &str = r#"{
    "version": "1.0",
    "truncation": null,
    "padding": null,
    "added_tokens": [],
    "normalizer": {"type": "Lowercase"},
    "pre_tokenizer": {"type": "Whitespace"},
    "post_processor": null,
    "decoder": null,
    "model": {
        "type": "WordLevel",
        "vocab": {
            "[PAD]": 0, "[UNK]": 1,
            "how": 2, "do": 3, "i": 4, "reset": 5, "my": 6, "password": 7,
            "open": 8, "a": 9, "savings": 10, "account": 11, "credit": 12, "card": 13,
            "travel": 14, "rewards": 15, "mortgage": 16, "loan": 17, "mobile": 18,
            "deposit": 19, "fees": 20, "interest": 21, "high": 22, "login": 23
        },
        "unk_token": "[UNK]"
    }
}"#;

/// Deterministic stand-in for a transformer encoder
pub struct FakeEncoder {
    pub dim: usize,
    pub backend: ExecutionBackend,
}

impl FakeEncoder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            backend: ExecutionBackend::Cpu,
        }
    }
}

impl HiddenStateRunner for FakeEncoder {
    fn run(&self, batch: &TokenBatch) -> EmbeddingResult<Array3<f32>> {
        let (b, s) = batch.input_ids.dim();
        Ok(Array3::from_shape_fn((b, s, self.dim), |(i, j, k)| {
            let id = batch.input_ids[[i, j]] as f32;
            ((id + 1.0) * (k as f32 + 1.0) * 0.37).sin()
        }))
    }

    fn backend(&self) -> ExecutionBackend {
        self.backend
    }
}

pub fn test_config(dim: usize) -> EmbeddingConfig {
    EmbeddingConfig {
        model_dir: PathBuf::from("/models/all-MiniLM-L6-v2-onnx"),
        embedding_dim: dim,
        max_length: TEST_MAX_LENGTH,
        ..Default::default()
    }
}

pub fn test_service() -> EmbeddingService {
    let tokenizer = TextTokenizer::from_json(VOCAB_JSON).expect("fixture tokenizer parses");
    EmbeddingService::from_parts(
        tokenizer,
        Box::new(FakeEncoder::new(TEST_DIM)),
        test_config(TEST_DIM),
    )
}

pub fn test_settings() -> Settings {
    Settings {
        embedding_dim: TEST_DIM,
        max_length: TEST_MAX_LENGTH,
        ..Settings::default()
    }
}

/// State backed by a ready fake model and an empty in-memory store
pub fn ready_state() -> (AppState, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new(MetricType::L2));
    let model = Arc::new(ModelHandle::ready(Arc::new(test_service())));
    (AppState::new(test_settings(), model, store.clone()), store)
}

/// State whose model has not been loaded
pub fn unloaded_state() -> AppState {
    let store = Arc::new(MemoryStore::new(MetricType::L2));
    AppState::new(test_settings(), Arc::new(ModelHandle::new()), store)
}

/// Sends `body` as JSON (or an empty GET when `None`) and returns status and parsed body
pub async fn send_json(
    app: axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (axum::http::StatusCode, serde_json::Value) {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(json) => builder.body(Body::from(json.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}
