// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! EmbedResponse and EmbeddingItem types

use serde::{Deserialize, Serialize};

use crate::embeddings::EmbeddedText;

/// Embedding of one input text
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingItem {
    /// Unit-length embedding vector
    pub embedding: Vec<f32>,

    /// Original input text
    pub text: String,

    /// Real (unpadded) tokens after truncation
    pub token_count: usize,
}

/// Response body for POST /v1/embed
///
/// ```json
/// {
///   "embeddings": [{"embedding": [0.1, ...], "text": "Hello", "tokenCount": 3}],
///   "model": "all-MiniLM-L6-v2",
///   "backend": "CPU",
///   "dimension": 384,
///   "totalTokens": 3
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedResponse {
    pub embeddings: Vec<EmbeddingItem>,
    pub model: String,
    /// Execution backend chosen at load time
    pub backend: String,
    pub dimension: usize,
    pub total_tokens: usize,
}

impl EmbedResponse {
    /// Pairs each input text with its embedding, in order
    pub fn from_embedded(
        texts: Vec<String>,
        embedded: Vec<EmbeddedText>,
        model: impl Into<String>,
        backend: impl Into<String>,
        dimension: usize,
    ) -> Self {
        let embeddings: Vec<EmbeddingItem> = texts
            .into_iter()
            .zip(embedded)
            .map(|(text, e)| EmbeddingItem {
                embedding: e.vector,
                text,
                token_count: e.token_count,
            })
            .collect();
        let total_tokens = embeddings.iter().map(|e| e.token_count).sum();
        Self {
            embeddings,
            model: model.into(),
            backend: backend.into(),
            dimension,
            total_tokens,
        }
    }
}
