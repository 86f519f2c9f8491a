// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use crate::common::{ready_state, send_json, unloaded_state, TEST_DIM};
use axum::http::StatusCode;
use semantic_search_node::api::create_app;

#[tokio::test]
async fn test_health_reports_model_when_ready() {
    let (state, _) = ready_state();
    let (status, body) = send_json(create_app(state), "GET", "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["app"], "semantic-search-milvus");
    assert_eq!(body["model"], "all-MiniLM-L6-v2");
    assert_eq!(body["backend"], "CPU");
    assert_eq!(body["dimension"], TEST_DIM);
}

#[tokio::test]
async fn test_health_unavailable_before_load() {
    let (status, body) = send_json(create_app(unloaded_state()), "GET", "/healthz", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unavailable");
    assert_eq!(body["model_status"], "unloaded");
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (state, _) = ready_state();
    let (status, _) = send_json(create_app(state), "GET", "/v1/models", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
