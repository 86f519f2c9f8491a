// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /v1/embed HTTP handler

use axum::{extract::State, Json};
use tracing::{debug, warn};

use crate::api::embed::{EmbedRequest, EmbedResponse};
use crate::api::{ApiError, AppState};

/// Embeds 1-96 texts with the loaded model
///
/// Validation failures are 400, an unready model is 503 and an embedding
/// failure is 500.
pub async fn embed_handler(
    State(state): State<AppState>,
    Json(request): Json<EmbedRequest>,
) -> Result<Json<EmbedResponse>, ApiError> {
    if let Err(e) = request.validate() {
        warn!("Rejected embed request: {}", e);
        return Err(e);
    }

    let service = state.model.get().await?;
    debug!("Embedding {} texts", request.texts.len());

    let embedded = service.clone().embed_blocking(request.texts.clone()).await?;

    Ok(Json(EmbedResponse::from_embedded(
        request.texts,
        embedded,
        service.model_name(),
        service.backend().as_str(),
        service.dimension(),
    )))
}
