// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Embedding service
//!
//! Composition root for the pipeline. Each call makes exactly one batched pass
//! through tokenizer, runner and pooler. Nothing is cached between calls.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use super::backend::{BackendPreference, ExecutionBackend};
use super::error::{EmbeddingError, EmbeddingResult};
use super::pooling::pool_and_normalize;
use super::runner::{resolve_model_file, HiddenStateRunner, OnnxRunner};
use super::tokenizer::TextTokenizer;

/// Text embedded at startup to check the model's output width
pub const PROBE_TEXT: &str = "dimension probe";

/// Everything needed to load the model
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Directory holding `tokenizer.json` and the ONNX graph
    pub model_dir: PathBuf,
    /// Explicit graph filename; `model_quant.onnx`/`model.onnx` when unset
    pub model_filename: Option<String>,
    pub embedding_dim: usize,
    pub max_length: usize,
    pub backend: BackendPreference,
    pub intra_threads: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("/models/all-MiniLM-L6-v2-onnx"),
            model_filename: None,
            embedding_dim: 384,
            max_length: 256,
            backend: BackendPreference::Auto,
            intra_threads: 4,
        }
    }
}

impl EmbeddingConfig {
    /// Model name derived from the directory, with any `-onnx` suffix removed
    pub fn model_name(&self) -> String {
        let dir = self
            .model_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "embedding-model".to_string());
        dir.strip_suffix("-onnx").map(str::to_string).unwrap_or(dir)
    }
}

/// One embedded text with its real token count
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedText {
    pub vector: Vec<f32>,
    pub token_count: usize,
}

/// Tokenizer, runner and pooler behind `embed_documents` / `embed_query`
pub struct EmbeddingService {
    tokenizer: TextTokenizer,
    runner: Box<dyn HiddenStateRunner>,
    config: EmbeddingConfig,
    model_name: String,
}

impl std::fmt::Debug for EmbeddingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingService")
            .field("model_name", &self.model_name)
            .field("backend", &self.runner.backend())
            .field("dimension", &self.config.embedding_dim)
            .field("max_length", &self.config.max_length)
            .finish()
    }
}

impl EmbeddingService {
    /// Loads tokenizer and graph from `config.model_dir` and verifies the dimension
    ///
    /// Blocking; call from `spawn_blocking` inside async code.
    pub fn load(config: EmbeddingConfig) -> EmbeddingResult<Self> {
        if config.max_length == 0 {
            return Err(EmbeddingError::Configuration(
                "MAX_LENGTH must be greater than 0".to_string(),
            ));
        }
        if config.embedding_dim == 0 {
            return Err(EmbeddingError::Configuration(
                "EMBEDDING_DIM must be greater than 0".to_string(),
            ));
        }

        let tokenizer = TextTokenizer::from_file(config.model_dir.join("tokenizer.json"))?;
        let model_path = resolve_model_file(&config.model_dir, config.model_filename.as_deref())?;
        let runner = OnnxRunner::load(&model_path, config.backend, config.intra_threads)?;

        let service = Self::from_parts(tokenizer, Box::new(runner), config);
        service.verify()?;

        info!(
            "✅ Embedding model '{}' ready ({}D, backend {})",
            service.model_name,
            service.dimension(),
            service.backend()
        );
        Ok(service)
    }

    /// Assembles a service from already-loaded parts without verification
    pub fn from_parts(
        tokenizer: TextTokenizer,
        runner: Box<dyn HiddenStateRunner>,
        config: EmbeddingConfig,
    ) -> Self {
        let model_name = config.model_name();
        Self {
            tokenizer,
            runner,
            config,
            model_name,
        }
    }

    /// Embeds [`PROBE_TEXT`] and checks its width against `embedding_dim`
    pub fn verify(&self) -> EmbeddingResult<()> {
        let probe = self.embed_query(PROBE_TEXT)?;
        if probe.len() != self.config.embedding_dim {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.config.embedding_dim,
                actual: probe.len(),
            });
        }
        Ok(())
    }

    /// One unit vector per text, in input order
    pub fn embed_documents<S: AsRef<str>>(&self, texts: &[S]) -> EmbeddingResult<Vec<Vec<f32>>> {
        Ok(self
            .embed_with_token_counts(texts)?
            .into_iter()
            .map(|e| e.vector)
            .collect())
    }

    pub fn embed_query(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        self.embed_documents(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Failure("query produced no embedding".to_string()))
    }

    /// Like [`embed_documents`](Self::embed_documents), keeping each text's token count
    pub fn embed_with_token_counts<S: AsRef<str>>(
        &self,
        texts: &[S],
    ) -> EmbeddingResult<Vec<EmbeddedText>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let batch = self.tokenizer.encode_batch(texts, self.config.max_length)?;
        let hidden = self.runner.run(&batch)?;
        if hidden.shape()[0] != texts.len() {
            return Err(EmbeddingError::Failure(format!(
                "runner returned {} rows for {} texts",
                hidden.shape()[0],
                texts.len()
            )));
        }
        let vectors = pool_and_normalize(hidden.view(), batch.attention_mask.view())?;

        debug!(
            "Embedded {} texts ({} x {} tokens)",
            texts.len(),
            batch.batch_size(),
            batch.seq_len()
        );

        Ok(vectors
            .into_iter()
            .zip(batch.token_counts())
            .map(|(vector, token_count)| EmbeddedText {
                vector,
                token_count,
            })
            .collect())
    }

    /// Runs [`embed_with_token_counts`](Self::embed_with_token_counts) on the blocking pool
    pub async fn embed_blocking(
        self: Arc<Self>,
        texts: Vec<String>,
    ) -> EmbeddingResult<Vec<EmbeddedText>> {
        tokio::task::spawn_blocking(move || self.embed_with_token_counts(&texts))
            .await
            .map_err(|e| EmbeddingError::Failure(format!("embedding task failed: {}", e)))?
    }

    /// [`embed_query`](Self::embed_query) on the blocking pool
    pub async fn embed_query_blocking(self: Arc<Self>, text: String) -> EmbeddingResult<Vec<f32>> {
        tokio::task::spawn_blocking(move || self.embed_query(&text))
            .await
            .map_err(|e| EmbeddingError::Failure(format!("embedding task failed: {}", e)))?
    }

    pub fn dimension(&self) -> usize {
        self.config.embedding_dim
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn backend(&self) -> ExecutionBackend {
        self.runner.backend()
    }
}
