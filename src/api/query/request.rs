// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Query API request types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::ApiError;
use crate::vectorstore::{CollectionKind, SearchRequest, MAX_PAGE_SIZE};

/// Longest query accepted, in characters
pub const MAX_QUERY_CHARS: usize = 8192;

/// Request body for POST /query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// `help_support` or `services`
    pub collection: String,

    pub query: String,

    /// 1-based page number (default 1)
    #[serde(default = "default_page")]
    pub page: usize,

    /// Results per page (1-100, default 5)
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Flat `field -> value | [values]` map, ANDed together
    #[serde(default)]
    pub metadata_filter: Option<Map<String, Value>>,

    #[serde(default)]
    pub output_fields: Option<Vec<String>>,

    /// Index search parameter overrides, e.g. `{"nprobe": 32}`
    #[serde(default)]
    pub search_params: Option<Map<String, Value>>,

    /// Fuse dense results with BM25 on the query text
    #[serde(default)]
    pub hybrid: bool,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    5
}

impl QueryRequest {
    /// Validates the request and resolves its collection type
    pub fn validate(&self) -> Result<CollectionKind, ApiError> {
        let kind: CollectionKind = self.collection.parse().map_err(|_| {
            ApiError::InvalidRequest(
                "Invalid collection. Use 'help_support' or 'services'.".to_string(),
            )
        })?;

        if self.query.trim().is_empty() {
            return Err(ApiError::ValidationError {
                field: "query".to_string(),
                message: "query cannot be empty".to_string(),
            });
        }
        if self.query.chars().count() > MAX_QUERY_CHARS {
            return Err(ApiError::ValidationError {
                field: "query".to_string(),
                message: format!("query cannot exceed {} characters", MAX_QUERY_CHARS),
            });
        }
        if self.page < 1 {
            return Err(ApiError::ValidationError {
                field: "page".to_string(),
                message: "page must be at least 1".to_string(),
            });
        }
        if self.page_size < 1 || self.page_size > MAX_PAGE_SIZE {
            return Err(ApiError::ValidationError {
                field: "page_size".to_string(),
                message: format!("page_size must be between 1 and {}", MAX_PAGE_SIZE),
            });
        }
        if let Some(fields) = &self.output_fields {
            if let Some(unknown) = fields.iter().find(|f| !kind.has_field(f)) {
                return Err(ApiError::ValidationError {
                    field: "output_fields".to_string(),
                    message: format!("'{}' is not a field of {}", unknown, kind),
                });
            }
        }
        Ok(kind)
    }

    pub fn search_request(&self) -> SearchRequest {
        SearchRequest {
            page: self.page,
            page_size: self.page_size,
            metadata_filter: self.metadata_filter.clone(),
            output_fields: self.output_fields.clone(),
            search_params: self.search_params.clone(),
        }
    }
}
