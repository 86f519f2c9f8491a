// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Sentence embedding pipeline
//!
//! Tokenizer -> ONNX runner -> masked mean pool + L2 normalize, composed by
//! [`EmbeddingService`] and owned process-wide by [`ModelHandle`].

pub mod backend;
pub mod error;
pub mod lifecycle;
pub mod pooling;
pub mod runner;
pub mod service;
pub mod tokenizer;

pub use backend::{resolve_backend, BackendPreference, ExecutionBackend, ProbeError};
pub use error::{EmbeddingError, EmbeddingResult};
pub use lifecycle::{ModelHandle, ModelStatus};
pub use pooling::{l2_normalize, mean_pool, pool_and_normalize};
pub use runner::{resolve_model_file, HiddenStateRunner, InputBinding, OnnxRunner};
pub use service::{EmbeddedText, EmbeddingConfig, EmbeddingService, PROBE_TEXT};
pub use tokenizer::{TextTokenizer, TokenBatch, PAD_TOKEN_ID};
