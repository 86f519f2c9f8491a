// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::embed::embed_handler;
use super::ingest::ingest_handler;
use super::query::query_handler;
use crate::config::Settings;
use crate::embeddings::{ModelHandle, ModelStatus};
use crate::vectorstore::VectorStore;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub model: Arc<ModelHandle>,
    pub store: Arc<dyn VectorStore>,
}

impl AppState {
    pub fn new(settings: Settings, model: Arc<ModelHandle>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            settings: Arc::new(settings),
            model,
            store,
        }
    }
}

/// `*` allows any origin; otherwise only the listed origins
fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();
    base.allow_origin(allowed)
}

pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.cors_allow_origins);
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/v1/embed", post(embed_handler))
        .route("/ingest/:collection", post(ingest_handler))
        .route("/query", post(query_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn start_server(state: AppState) -> anyhow::Result<()> {
    let addr = state.settings.bind_address();
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("API server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let app = state.settings.app_name.clone();
    match state.model.get().await {
        Ok(service) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "app": app,
                "model": service.model_name(),
                "backend": service.backend().as_str(),
                "dimension": service.dimension(),
            })),
        ),
        Err(_) => {
            let model_status = match state.model.status().await {
                ModelStatus::Unloaded => "unloaded".to_string(),
                ModelStatus::Loading => "loading".to_string(),
                ModelStatus::Ready => "ready".to_string(),
                ModelStatus::Failed { code, .. } => format!("failed ({})", code),
            };
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unavailable",
                    "app": app,
                    "model_status": model_status,
                })),
            )
        }
    }
}
