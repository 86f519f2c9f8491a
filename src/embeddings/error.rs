// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for the embedding pipeline
//!
//! Everything except [`EmbeddingError::Failure`] is raised while the model is
//! loading and is fatal for the process. `Failure` is scoped to a single batch.

use thiserror::Error;

/// Errors produced by the tokenizer, runner, pooler and service
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// A resource file is missing or unreadable, or a setting is invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The ONNX graph could not be loaded or does not declare the required inputs
    #[error("Model load error: {0}")]
    ModelLoad(String),

    /// An accelerated backend was requested explicitly and is not present
    #[error("Execution backend unavailable: {backend} ({reason})")]
    BackendUnavailable { backend: String, reason: String },

    /// The loaded model's output dimension disagrees with the configured one
    #[error("Dimension mismatch: model produces {actual}D vectors, configured for {expected}D")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Runtime failure while tokenizing, running or pooling a batch
    #[error("Embedding failed: {0}")]
    Failure(String),

    /// embed_* was called while the shared model is not Ready
    #[error("Embedding model not ready: {0}")]
    NotReady(String),
}

impl EmbeddingError {
    /// Whether this error must abort process startup
    pub fn is_fatal(&self) -> bool {
        !matches!(self, EmbeddingError::Failure(_) | EmbeddingError::NotReady(_))
    }

    /// Stable error code for logs and API error bodies
    pub fn error_code(&self) -> &'static str {
        match self {
            EmbeddingError::Configuration(_) => "CONFIGURATION_ERROR",
            EmbeddingError::ModelLoad(_) => "MODEL_LOAD_ERROR",
            EmbeddingError::BackendUnavailable { .. } => "BACKEND_UNAVAILABLE",
            EmbeddingError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            EmbeddingError::Failure(_) => "EMBEDDING_FAILURE",
            EmbeddingError::NotReady(_) => "MODEL_NOT_READY",
        }
    }
}

pub type EmbeddingResult<T> = std::result::Result<T, EmbeddingError>;
