// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Ingest then query through the router, backed by the in-memory store

use crate::common::{ready_state, send_json, unloaded_state};
use axum::http::StatusCode;
use semantic_search_node::api::{create_app, AppState};
use semantic_search_node::vectorstore::{ensure_collections, MemoryStore};
use serde_json::{json, Value};
use std::sync::Arc;

async fn prepared_state() -> (AppState, Arc<MemoryStore>) {
    let (state, store) = ready_state();
    ensure_collections(store.as_ref(), &state.settings.schemas())
        .await
        .unwrap();
    (state, store)
}

fn services_items() -> Value {
    json!([
        {
            "service_id": "svc-savings",
            "url": "https://bank.example/accounts/savings",
            "name": "High interest savings account",
            "description": "Open a savings account with high interest",
            "intent_entity": "account_opening-savings"
        },
        {
            "service_id": "svc-card",
            "url": "https://bank.example/cards/travel",
            "name": "Travel rewards credit card",
            "description": "Credit card with travel rewards",
            "intent_entity": "card_application-travel"
        },
        {
            "service_id": "svc-mortgage",
            "url": "https://bank.example/loans/mortgage",
            "name": "Mortgage loan",
            "description": "Mortgage loan for a home",
            "intent_entity": "loan_application-mortgage"
        }
    ])
}

#[tokio::test]
async fn test_ingest_reports_count_and_duplicates() {
    let (state, store) = prepared_state().await;
    let mut items = services_items();
    let duplicate = items[0].clone();
    items.as_array_mut().unwrap().push(duplicate);

    let (status, body) = send_json(
        create_app(state),
        "POST",
        "/ingest/services",
        Some(items),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ingested"], 3);
    assert_eq!(body["collection"], "services");
    assert_eq!(body["skipped_duplicates"], 1);
    assert_eq!(store.count("services").await, Some(3));
}

#[tokio::test]
async fn test_reingest_replaces_by_primary_key() {
    let (state, store) = prepared_state().await;
    let app = create_app(state);
    for _ in 0..2 {
        let (status, _) = send_json(app.clone(), "POST", "/ingest/services", Some(services_items())).await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(store.count("services").await, Some(3));
}

#[tokio::test]
async fn test_ingest_rejects_unknown_collection() {
    let (state, _) = prepared_state().await;
    let (status, body) = send_json(
        create_app(state),
        "POST",
        "/ingest/loans",
        Some(json!([])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Invalid collection. Use 'help_support' or 'services'.");
}

#[tokio::test]
async fn test_ingest_rejects_malformed_item() {
    let (state, store) = prepared_state().await;
    let (status, body) = send_json(
        create_app(state),
        "POST",
        "/ingest/help_support",
        Some(json!([{"id": "help-1", "url": "https://bank.example/help"}])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], "items[0]");
    assert_eq!(store.count("help_support").await, Some(0));
}

#[tokio::test]
async fn test_query_returns_nearest_first() {
    let (state, _) = prepared_state().await;
    let app = create_app(state);
    send_json(app.clone(), "POST", "/ingest/services", Some(services_items())).await;

    let (status, body) = send_json(
        app,
        "POST",
        "/query",
        Some(json!({
            "collection": "services",
            "query": "Mortgage loan Mortgage loan for a home loan_application-mortgage",
            "page_size": 2
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["collection"], "services");
    assert_eq!(body["page"], 1);
    assert_eq!(body["page_size"], 2);
    assert_eq!(body["count"], 2);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results[0]["service_id"], "svc-mortgage");
    assert!(results[0]["distance"].as_f64().unwrap() <= results[1]["distance"].as_f64().unwrap());
    assert!(results[0].get("embedding").is_none());
}

#[tokio::test]
async fn test_query_metadata_filter_and_output_fields() {
    let (state, _) = prepared_state().await;
    let app = create_app(state);
    send_json(app.clone(), "POST", "/ingest/services", Some(services_items())).await;

    let (status, body) = send_json(
        app,
        "POST",
        "/query",
        Some(json!({
            "collection": "services",
            "query": "savings account",
            "metadata_filter": {"intent_entity": "card_application-travel"},
            "output_fields": ["name"]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    let hit = &body["results"][0];
    assert_eq!(hit["name"], "Travel rewards credit card");
    assert!(hit.get("description").is_none());
}

#[tokio::test]
async fn test_query_second_page_continues_first() {
    let (state, _) = prepared_state().await;
    let app = create_app(state);
    send_json(app.clone(), "POST", "/ingest/services", Some(services_items())).await;

    let query = |page: usize| {
        json!({"collection": "services", "query": "credit card", "page": page, "page_size": 2})
    };
    let (_, first) = send_json(app.clone(), "POST", "/query", Some(query(1))).await;
    let (_, second) = send_json(app, "POST", "/query", Some(query(2))).await;

    assert_eq!(first["count"], 2);
    assert_eq!(second["count"], 1);
    let first_ids: Vec<&Value> = first["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| &h["service_id"])
        .collect();
    assert!(!first_ids.contains(&&second["results"][0]["service_id"]));
}

#[tokio::test]
async fn test_query_validation_errors() {
    let (state, _) = prepared_state().await;
    let app = create_app(state);
    for body in [
        json!({"collection": "loans", "query": "x"}),
        json!({"collection": "services", "query": "  "}),
        json!({"collection": "services", "query": "x", "page": 0}),
        json!({"collection": "services", "query": "x", "page_size": 101}),
        json!({"collection": "services", "query": "x", "output_fields": ["salary"]}),
    ] {
        let (status, _) = send_json(app.clone(), "POST", "/query", Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    }
}

#[tokio::test]
async fn test_query_missing_collection_is_400() {
    // Collections were never created in the store
    let (state, _) = ready_state();
    let (status, body) = send_json(
        create_app(state),
        "POST",
        "/query",
        Some(json!({"collection": "help_support", "query": "reset my password"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_query_without_model_is_503() {
    let (status, _) = send_json(
        create_app(unloaded_state()),
        "POST",
        "/query",
        Some(json!({"collection": "services", "query": "mortgage"})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_hybrid_query_on_memory_store_is_400() {
    let (state, _) = prepared_state().await;
    let app = create_app(state);
    let (status, _) = send_json(app.clone(), "POST", "/ingest/services", Some(services_items())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_json(
        app.clone(),
        "POST",
        "/query",
        Some(json!({"collection": "services", "query": "savings account", "hybrid": true})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("hybrid"));

    let (status, _) = send_json(
        app,
        "POST",
        "/query",
        Some(json!({"collection": "services", "query": "savings account", "hybrid": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
