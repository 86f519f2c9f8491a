// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! POST /ingest/:collection handler

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{ApiError, AppState};
use crate::ingestion::ingest_items;
use crate::vectorstore::CollectionKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResponse {
    pub ingested: usize,
    pub collection: String,
    pub skipped_duplicates: usize,
}

/// Validates, embeds and upserts a JSON array of items
///
/// The item shape depends on the collection type in the path.
pub async fn ingest_handler(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Json(items): Json<Vec<Value>>,
) -> Result<Json<IngestResponse>, ApiError> {
    let kind: CollectionKind = collection.parse().map_err(|_| {
        ApiError::InvalidRequest(
            "Invalid collection. Use 'help_support' or 'services'.".to_string(),
        )
    })?;
    let schema = state.settings.schema(kind);
    let service = state.model.get().await?;

    let report = ingest_items(service, state.store.as_ref(), &schema, items)
        .await
        .map_err(ApiError::request_failure)?;

    Ok(Json(IngestResponse {
        ingested: report.ingested,
        collection: kind.as_str().to_string(),
        skipped_duplicates: report.skipped_duplicates,
    }))
}
