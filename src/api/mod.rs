// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod embed;
pub mod errors;
pub mod http_server;
pub mod ingest;
pub mod query;

pub use embed::{embed_handler, EmbedRequest, EmbedResponse, EmbeddingItem};
pub use errors::{ApiError, ErrorResponse};
pub use http_server::{create_app, start_server, AppState};
pub use ingest::{ingest_handler, IngestResponse};
pub use query::{query_handler, QueryRequest, QueryResponse};
