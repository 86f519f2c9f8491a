// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX Runtime execution of the sentence transformer
//!
//! Loads the graph once, on the backend chosen by [`resolve_backend`], and
//! turns a [`TokenBatch`] into `[batch, seq_len, hidden_dim]` hidden states.
//!
//! Input wiring follows what the graph declares:
//! - ids go to `input_ids`, or to the first declared input if that name is absent
//! - `attention_mask` is fed when declared
//! - `token_type_ids` (all zeros) is fed only when declared

use ndarray::{Array3, Ix3};
use ort::ep::{
    ExecutionProvider, CPU as CPUExecutionProvider, CUDA as CUDAExecutionProvider,
};
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::{Session, SessionInputValue};
use ort::value::Value;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

use super::backend::{resolve_backend, BackendPreference, ExecutionBackend, ProbeError};
use super::error::{EmbeddingError, EmbeddingResult};
use super::tokenizer::TokenBatch;

/// Produces per-token hidden states for a token batch
///
/// Implementations are loaded once and shared across request tasks.
pub trait HiddenStateRunner: Send + Sync {
    fn run(&self, batch: &TokenBatch) -> EmbeddingResult<Array3<f32>>;

    /// Backend the runner settled on at load time
    fn backend(&self) -> ExecutionBackend;
}

/// Graph file lookup inside a model directory
///
/// An explicit filename wins; otherwise `model_quant.onnx` is preferred over
/// `model.onnx` when both exist.
pub fn resolve_model_file(model_dir: &Path, filename: Option<&str>) -> EmbeddingResult<PathBuf> {
    let path = match filename {
        Some(name) => model_dir.join(name),
        None => {
            let quantized = model_dir.join("model_quant.onnx");
            if quantized.exists() {
                quantized
            } else {
                model_dir.join("model.onnx")
            }
        }
    };
    if !path.exists() {
        return Err(EmbeddingError::ModelLoad(format!(
            "ONNX model not found at {}",
            path.display()
        )));
    }
    Ok(path)
}

/// Names of the graph inputs this runner feeds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputBinding {
    pub ids: String,
    pub attention_mask: Option<String>,
    pub token_type_ids: Option<String>,
}

impl InputBinding {
    /// Maps declared graph input names onto the tensors we can supply
    pub fn from_declared<S: AsRef<str>>(declared: &[S]) -> EmbeddingResult<Self> {
        let names: Vec<&str> = declared.iter().map(|s| s.as_ref()).collect();
        let ids = if names.contains(&"input_ids") {
            "input_ids"
        } else {
            names.first().copied().ok_or_else(|| {
                EmbeddingError::ModelLoad("model does not declare any inputs".to_string())
            })?
        };
        let find = |name: &str| {
            names
                .iter()
                .find(|n| **n == name && **n != ids)
                .map(|n| n.to_string())
        };
        Ok(Self {
            ids: ids.to_string(),
            attention_mask: find("attention_mask"),
            token_type_ids: find("token_type_ids"),
        })
    }
}

/// Sentence-transformer session on ONNX Runtime
pub struct OnnxRunner {
    /// `Session::run` needs exclusive access
    session: Mutex<Session>,
    binding: InputBinding,
    backend: ExecutionBackend,
    model_path: PathBuf,
}

impl std::fmt::Debug for OnnxRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxRunner")
            .field("model_path", &self.model_path)
            .field("backend", &self.backend)
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}

impl OnnxRunner {
    /// Loads the graph, probing backends in `preference` order
    ///
    /// # Errors
    /// - `ModelLoad` if the file is missing, the graph is invalid, or it declares no inputs
    /// - `BackendUnavailable` if CUDA was requested explicitly and cannot be used
    pub fn load(
        model_path: impl AsRef<Path>,
        preference: BackendPreference,
        intra_threads: usize,
    ) -> EmbeddingResult<Self> {
        let model_path = model_path.as_ref().to_path_buf();
        if !model_path.exists() {
            return Err(EmbeddingError::ModelLoad(format!(
                "ONNX model not found at {}",
                model_path.display()
            )));
        }

        info!(
            "Loading ONNX embedding model from {} (backend preference: {})",
            model_path.display(),
            preference
        );

        let (backend, session) = resolve_backend(preference, |backend| {
            build_session(&model_path, backend, intra_threads)
        })?;

        let declared: Vec<String> = session.inputs().iter().map(|i| i.name().to_string()).collect();
        debug!("Model inputs: {:?}", declared);
        let binding = InputBinding::from_declared(&declared)?;

        info!("ONNX embedding model loaded on {}", backend);

        Ok(Self {
            session: Mutex::new(session),
            binding,
            backend,
            model_path,
        })
    }
}

fn build_session(
    model_path: &Path,
    backend: ExecutionBackend,
    intra_threads: usize,
) -> Result<Session, ProbeError> {
    let builder = Session::builder()
        .map_err(|e| ProbeError::Load(format!("Failed to create session builder: {}", e)))?;

    match backend {
        ExecutionBackend::Cuda => {
            let cuda = CUDAExecutionProvider::default();
            match cuda.is_available() {
                Ok(true) => {}
                Ok(false) => {
                    return Err(ProbeError::Unavailable(
                        "CUDA execution provider is not available on this host".to_string(),
                    ))
                }
                Err(e) => return Err(ProbeError::Unavailable(e.to_string())),
            }
            let builder = builder
                .with_execution_providers([cuda.build().error_on_failure()])
                .map_err(|e| ProbeError::Unavailable(e.to_string()))?;

            // The provider library can be present with no usable device; that
            // only surfaces when the session is committed.
            commit(builder, model_path, intra_threads).map_err(|cuda_err| {
                debug!("CUDA session commit failed, retrying on CPU: {}", cuda_err);
                classify_cuda_failure(
                    cuda_err,
                    build_session(model_path, ExecutionBackend::Cpu, intra_threads).map(drop),
                )
            })
        }
        ExecutionBackend::Cpu => {
            let builder = builder
                .with_execution_providers([CPUExecutionProvider::default().build()])
                .map_err(|e| {
                    ProbeError::Load(format!("Failed to set CPU execution provider: {}", e))
                })?;
            commit(builder, model_path, intra_threads).map_err(ProbeError::Load)
        }
    }
}

fn commit(
    builder: SessionBuilder,
    model_path: &Path,
    intra_threads: usize,
) -> Result<Session, String> {
    builder
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| format!("Failed to set optimization level: {}", e))?
        .with_intra_threads(intra_threads.max(1))
        .map_err(|e| format!("Failed to set intra threads: {}", e))?
        .commit_from_file(model_path)
        .map_err(|e| {
            format!(
                "Failed to load ONNX model from {}: {}",
                model_path.display(),
                e
            )
        })
}

/// Splits a failed CUDA commit into a device problem or a bad graph
///
/// `cpu_attempt` is the same graph committed on CPU: if that works the graph
/// is fine and CUDA is what cannot be used.
fn classify_cuda_failure(cuda_err: String, cpu_attempt: Result<(), ProbeError>) -> ProbeError {
    match cpu_attempt {
        Ok(()) => ProbeError::Unavailable(format!(
            "CUDA session could not be created but the model loads on CPU: {}",
            cuda_err
        )),
        Err(cpu_err) => cpu_err,
    }
}

fn failure(context: &str, e: impl std::fmt::Display) -> EmbeddingError {
    EmbeddingError::Failure(format!("{}: {}", context, e))
}

impl HiddenStateRunner for OnnxRunner {
    fn run(&self, batch: &TokenBatch) -> EmbeddingResult<Array3<f32>> {
        let mut inputs: Vec<(String, SessionInputValue<'static>)> = Vec::with_capacity(3);

        let ids = Value::from_array(batch.input_ids.clone())
            .map_err(|e| failure("Failed to create input_ids tensor", e))?;
        inputs.push((self.binding.ids.clone(), ids.into()));

        if let Some(name) = &self.binding.attention_mask {
            let mask = Value::from_array(batch.attention_mask.clone())
                .map_err(|e| failure("Failed to create attention_mask tensor", e))?;
            inputs.push((name.clone(), mask.into()));
        }

        if let Some(name) = &self.binding.token_type_ids {
            let type_ids = Value::from_array(batch.token_type_ids())
                .map_err(|e| failure("Failed to create token_type_ids tensor", e))?;
            inputs.push((name.clone(), type_ids.into()));
        }

        let mut session = self
            .session
            .lock()
            .map_err(|_| EmbeddingError::Failure("ONNX session lock poisoned".to_string()))?;
        let outputs = session
            .run(inputs)
            .map_err(|e| failure("ONNX inference failed", e))?;

        // First declared output is last_hidden_state
        let hidden = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| failure("Failed to extract output tensor", e))?;
        let hidden = hidden.into_dimensionality::<Ix3>().map_err(|e| {
            failure("Expected [batch, seq_len, hidden_dim] output", e)
        })?;

        Ok(hidden.to_owned())
    }

    fn backend(&self) -> ExecutionBackend {
        self.backend
    }
}
