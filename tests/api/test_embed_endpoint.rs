// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use crate::common::{ready_state, send_json, unloaded_state, TEST_DIM};
use axum::http::StatusCode;
use semantic_search_node::api::create_app;
use serde_json::json;

#[tokio::test]
async fn test_embed_returns_one_vector_per_text() {
    let (state, _) = ready_state();
    let (status, body) = send_json(
        create_app(state),
        "POST",
        "/v1/embed",
        Some(json!({"texts": ["reset my password", "open a savings account"]})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let embeddings = body["embeddings"].as_array().unwrap();
    assert_eq!(embeddings.len(), 2);
    assert_eq!(embeddings[0]["text"], "reset my password");
    assert_eq!(embeddings[0]["embedding"].as_array().unwrap().len(), TEST_DIM);
    assert_eq!(embeddings[0]["tokenCount"], 3);
    assert_eq!(embeddings[1]["tokenCount"], 4);
    assert_eq!(body["totalTokens"], 7);
    assert_eq!(body["dimension"], TEST_DIM);
    assert_eq!(body["model"], "all-MiniLM-L6-v2");
}

#[tokio::test]
async fn test_embed_rejects_empty_texts() {
    let (state, _) = ready_state();
    let (status, body) = send_json(
        create_app(state),
        "POST",
        "/v1/embed",
        Some(json!({"texts": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "validation_error");
    assert_eq!(body["details"]["field"], "texts");
}

#[tokio::test]
async fn test_embed_rejects_whitespace_text() {
    let (state, _) = ready_state();
    let (status, body) = send_json(
        create_app(state),
        "POST",
        "/v1/embed",
        Some(json!({"texts": ["ok", "   "]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], "texts[1]");
}

#[tokio::test]
async fn test_embed_rejects_too_many_texts() {
    let (state, _) = ready_state();
    let texts: Vec<String> = (0..97).map(|i| format!("text {}", i)).collect();
    let (status, _) = send_json(
        create_app(state),
        "POST",
        "/v1/embed",
        Some(json!({ "texts": texts })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_embed_without_model_is_503() {
    let (status, body) = send_json(
        create_app(unloaded_state()),
        "POST",
        "/v1/embed",
        Some(json!({"texts": ["hello"]})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error_type"], "service_unavailable");
    assert_eq!(body["detail"], body["message"]);
}
