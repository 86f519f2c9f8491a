// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod embeddings;
pub mod ingestion;
pub mod vectorstore;

// Re-export main types
pub use config::Settings;
pub use embeddings::{EmbeddingError, EmbeddingService, ModelHandle};
pub use vectorstore::{VectorStore, VectorStoreError};
