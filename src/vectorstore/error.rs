// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for vector store operations

use thiserror::Error;

/// Errors raised by a [`VectorStore`](super::VectorStore) implementation
#[derive(Error, Debug)]
pub enum VectorStoreError {
    /// The database could not be reached or returned a non-JSON body
    #[error("Vector store connection error: {0}")]
    Connection(String),

    /// The database answered with a non-zero status code
    #[error("Vector store returned error {code}: {message}")]
    Remote { code: i64, message: String },

    /// Collection name is not one this service manages
    #[error("Unknown collection '{0}'. Use 'help_support' or 'services'.")]
    UnknownCollection(String),

    /// A vector's length disagrees with the collection's dimension
    #[error("Dimension mismatch: expected {expected}D, got {actual}D vector")]
    DimensionMismatch { expected: usize, actual: usize },

    /// `metadata_filter` cannot be rendered into a filter expression
    #[error("Invalid metadata filter: {0}")]
    InvalidFilter(String),

    /// Record or search request failed validation
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl VectorStoreError {
    /// Whether the caller sent something wrong, as opposed to the store failing
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            VectorStoreError::Connection(_) | VectorStoreError::Remote { .. }
        )
    }
}

impl From<reqwest::Error> for VectorStoreError {
    fn from(e: reqwest::Error) -> Self {
        VectorStoreError::Connection(e.to_string())
    }
}

pub type StoreResult<T> = std::result::Result<T, VectorStoreError>;
