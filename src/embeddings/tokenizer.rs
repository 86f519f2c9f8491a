// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fixed-window tokenization
//!
//! Wraps a HuggingFace `tokenizer.json`. Any padding or truncation configured
//! inside the file is switched off on load; `encode_batch` applies its own
//! window so every row is exactly `max_length` wide.

use ndarray::Array2;
use std::path::Path;
use std::str::FromStr;
use tokenizers::Tokenizer;
use tracing::debug;

use super::error::{EmbeddingError, EmbeddingResult};

/// Id written into padded positions
pub const PAD_TOKEN_ID: i64 = 0;

/// Token ids and attention mask for a batch, both `[batch, max_length]`
#[derive(Debug, Clone, PartialEq)]
pub struct TokenBatch {
    pub input_ids: Array2<i64>,
    pub attention_mask: Array2<i64>,
}

impl TokenBatch {
    pub fn empty(max_length: usize) -> Self {
        Self {
            input_ids: Array2::zeros((0, max_length)),
            attention_mask: Array2::zeros((0, max_length)),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.input_ids.nrows()
    }

    pub fn seq_len(&self) -> usize {
        self.input_ids.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.batch_size() == 0
    }

    /// Real (unpadded) token count per row
    pub fn token_counts(&self) -> Vec<usize> {
        self.attention_mask
            .rows()
            .into_iter()
            .map(|row| row.iter().filter(|&&m| m != 0).count())
            .collect()
    }

    /// All-zero segment ids, for graphs that declare `token_type_ids`
    pub fn token_type_ids(&self) -> Array2<i64> {
        Array2::zeros(self.input_ids.raw_dim())
    }
}

/// Sub-word tokenizer loaded once and shared read-only
#[derive(Debug, Clone)]
pub struct TextTokenizer {
    inner: Tokenizer,
}

impl TextTokenizer {
    /// Loads `tokenizer.json` from disk
    ///
    /// # Errors
    /// `Configuration` if the file is missing or cannot be parsed.
    pub fn from_file(path: impl AsRef<Path>) -> EmbeddingResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(EmbeddingError::Configuration(format!(
                "Tokenizer not found at {}",
                path.display()
            )));
        }
        let inner = Tokenizer::from_file(path).map_err(|e| {
            EmbeddingError::Configuration(format!(
                "Failed to load tokenizer {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_tokenizer(inner)
    }

    /// Parses a tokenizer definition held in memory
    pub fn from_json(json: &str) -> EmbeddingResult<Self> {
        let inner = Tokenizer::from_str(json).map_err(|e| {
            EmbeddingError::Configuration(format!("Failed to parse tokenizer: {}", e))
        })?;
        Self::from_tokenizer(inner)
    }

    fn from_tokenizer(mut inner: Tokenizer) -> EmbeddingResult<Self> {
        inner.with_padding(None);
        inner
            .with_truncation(None)
            .map_err(|e| EmbeddingError::Configuration(format!("Tokenizer truncation: {}", e)))?;
        Ok(Self { inner })
    }

    /// Encodes `texts` into a `[texts.len(), max_length]` batch.
    ///
    /// Rows longer than `max_length` are truncated; shorter rows are padded
    /// with [`PAD_TOKEN_ID`] and mask 0. Row order follows `texts`.
    pub fn encode_batch<S: AsRef<str>>(
        &self,
        texts: &[S],
        max_length: usize,
    ) -> EmbeddingResult<TokenBatch> {
        if max_length == 0 {
            return Err(EmbeddingError::Configuration(
                "max_length must be greater than 0".to_string(),
            ));
        }
        if texts.is_empty() {
            return Ok(TokenBatch::empty(max_length));
        }

        let inputs: Vec<&str> = texts.iter().map(|t| t.as_ref()).collect();
        let encodings = self
            .inner
            .encode_batch(inputs, true)
            .map_err(|e| EmbeddingError::Failure(format!("Tokenization failed: {}", e)))?;

        let mut input_ids = Array2::from_elem((texts.len(), max_length), PAD_TOKEN_ID);
        let mut attention_mask = Array2::<i64>::zeros((texts.len(), max_length));

        for (row, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let len = ids.len().min(max_length);
            if ids.len() > max_length {
                debug!("Truncating input {} from {} to {} tokens", row, ids.len(), max_length);
            }
            for col in 0..len {
                input_ids[[row, col]] = i64::from(ids[col]);
                attention_mask[[row, col]] = mask.get(col).map_or(1, |&m| i64::from(m));
            }
        }

        Ok(TokenBatch {
            input_ids,
            attention_mask,
        })
    }
}
