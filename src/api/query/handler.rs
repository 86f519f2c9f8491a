// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! POST /query handler

use axum::{extract::State, Json};
use tracing::{debug, info};

use super::{QueryRequest, QueryResponse};
use crate::api::{ApiError, AppState};

/// Embeds the query and returns one page of nearest documents
///
/// With `hybrid` set the dense ranking is fused with BM25 matches on the query text.
pub async fn query_handler(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let kind = request.validate()?;
    let schema = state.settings.schema(kind);
    debug!(
        "Query on '{}' (page {}, page_size {}, hybrid {})",
        schema.name, request.page, request.page_size, request.hybrid
    );

    let service = state.model.get().await?;
    let vector = service
        .embed_query_blocking(request.query.clone())
        .await
        .map_err(ApiError::request_failure)?;

    let search = request.search_request();
    let results = if request.hybrid {
        state
            .store
            .hybrid_search(&schema, &vector, &request.query, &search)
            .await
    } else {
        state.store.search(&schema, &vector, &search).await
    }
    .map_err(ApiError::request_failure)?;

    info!("Query on '{}' returned {} hits", schema.name, results.len());

    Ok(Json(QueryResponse {
        collection: kind.as_str().to_string(),
        page: request.page,
        page_size: request.page_size,
        count: results.len(),
        results,
    }))
}
