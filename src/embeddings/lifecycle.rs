// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Shared model handle
//!
//! `Unloaded -> Loading -> Ready`, with `Failed` as a terminal state. A handle
//! that failed once never loads again; every later load or embed call reports
//! the original failure.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

use super::error::{EmbeddingError, EmbeddingResult};
use super::service::{EmbeddingConfig, EmbeddingService};

/// Observable state of a [`ModelHandle`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelStatus {
    Unloaded,
    Loading,
    Ready,
    Failed { code: &'static str, message: String },
}

enum ModelState {
    Unloaded,
    Loading,
    Ready(Arc<EmbeddingService>),
    Failed { code: &'static str, message: String },
}

/// Process-wide owner of the loaded [`EmbeddingService`]
pub struct ModelHandle {
    state: RwLock<ModelState>,
}

impl Default for ModelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelHandle {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ModelState::Unloaded),
        }
    }

    /// Handle that is already `Ready` with `service`
    pub fn ready(service: Arc<EmbeddingService>) -> Self {
        Self {
            state: RwLock::new(ModelState::Ready(service)),
        }
    }

    pub async fn status(&self) -> ModelStatus {
        match &*self.state.read().await {
            ModelState::Unloaded => ModelStatus::Unloaded,
            ModelState::Loading => ModelStatus::Loading,
            ModelState::Ready(_) => ModelStatus::Ready,
            ModelState::Failed { code, message } => ModelStatus::Failed {
                code,
                message: message.clone(),
            },
        }
    }

    /// Loads the model from `config` on the blocking pool
    pub async fn load(&self, config: EmbeddingConfig) -> EmbeddingResult<Arc<EmbeddingService>> {
        self.load_with(move || EmbeddingService::load(config)).await
    }

    /// Runs `loader` once and records the outcome
    ///
    /// Returns the existing service if already `Ready`. A concurrent call made
    /// while another load is in flight gets `NotReady`.
    pub async fn load_with<F>(&self, loader: F) -> EmbeddingResult<Arc<EmbeddingService>>
    where
        F: FnOnce() -> EmbeddingResult<EmbeddingService> + Send + 'static,
    {
        {
            let mut state = self.state.write().await;
            match &*state {
                ModelState::Unloaded => *state = ModelState::Loading,
                ModelState::Loading => {
                    return Err(EmbeddingError::NotReady(
                        "model load already in progress".to_string(),
                    ))
                }
                ModelState::Ready(service) => return Ok(service.clone()),
                ModelState::Failed { code, message } => {
                    return Err(EmbeddingError::NotReady(format!(
                        "model failed to load ({}): {}",
                        code, message
                    )))
                }
            }
        }

        let outcome = match tokio::task::spawn_blocking(loader).await {
            Ok(result) => result,
            Err(e) => Err(EmbeddingError::ModelLoad(format!("model loader panicked: {}", e))),
        };

        let mut state = self.state.write().await;
        match outcome {
            Ok(service) => {
                let service = Arc::new(service);
                info!("Embedding model handle is ready");
                *state = ModelState::Ready(service.clone());
                Ok(service)
            }
            Err(err) => {
                error!("❌ Embedding model failed to load: {}", err);
                *state = ModelState::Failed {
                    code: err.error_code(),
                    message: err.to_string(),
                };
                Err(err)
            }
        }
    }

    /// The loaded service, or `NotReady` outside the `Ready` state
    pub async fn get(&self) -> EmbeddingResult<Arc<EmbeddingService>> {
        match &*self.state.read().await {
            ModelState::Ready(service) => Ok(service.clone()),
            ModelState::Unloaded => Err(EmbeddingError::NotReady("model not loaded".to_string())),
            ModelState::Loading => Err(EmbeddingError::NotReady("model is loading".to_string())),
            ModelState::Failed { message, .. } => Err(EmbeddingError::NotReady(format!(
                "model failed to load: {}",
                message
            ))),
        }
    }
}
