// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Query API response types

use serde::{Deserialize, Serialize};

use crate::vectorstore::SearchHit;

/// Response body for POST /query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub collection: String,
    pub page: usize,
    pub page_size: usize,
    /// Hits on this page
    pub count: usize,
    pub results: Vec<SearchHit>,
}
