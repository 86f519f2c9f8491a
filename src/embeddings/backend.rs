// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Execution backend selection
//!
//! The preference string (`AUTO | CPU | CUDA`) expands into an ordered list of
//! candidate backends. Candidates are probed once, at load time, and the first
//! one that comes up is kept for the lifetime of the model.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use super::error::{EmbeddingError, EmbeddingResult};

/// Concrete execution backend a session runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionBackend {
    Cuda,
    Cpu,
}

impl ExecutionBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionBackend::Cuda => "CUDA",
            ExecutionBackend::Cpu => "CPU",
        }
    }
}

impl fmt::Display for ExecutionBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested backend policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendPreference {
    /// Accelerated first, CPU fallback
    #[default]
    Auto,
    Cpu,
    /// Accelerated only; never degrades to CPU
    Cuda,
}

impl BackendPreference {
    /// Ordered candidates to probe for this preference
    pub fn candidates(&self) -> &'static [ExecutionBackend] {
        match self {
            BackendPreference::Auto => &[ExecutionBackend::Cuda, ExecutionBackend::Cpu],
            BackendPreference::Cpu => &[ExecutionBackend::Cpu],
            BackendPreference::Cuda => &[ExecutionBackend::Cuda],
        }
    }

    pub fn is_automatic(&self) -> bool {
        matches!(self, BackendPreference::Auto)
    }
}

impl FromStr for BackendPreference {
    type Err = EmbeddingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AUTO" | "" => Ok(BackendPreference::Auto),
            "CPU" => Ok(BackendPreference::Cpu),
            "CUDA" | "GPU" | "ACCELERATED" => Ok(BackendPreference::Cuda),
            other => Err(EmbeddingError::Configuration(format!(
                "unknown backend preference '{}' (expected AUTO, CPU or CUDA)",
                other
            ))),
        }
    }
}

impl fmt::Display for BackendPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendPreference::Auto => f.write_str("AUTO"),
            BackendPreference::Cpu => f.write_str("CPU"),
            BackendPreference::Cuda => f.write_str("CUDA"),
        }
    }
}

/// Why a single backend probe failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The backend is not installed or cannot register on this host
    Unavailable(String),
    /// The backend exists but the model failed to load on it
    Load(String),
}

/// Probes candidates in priority order and returns the first that succeeds.
///
/// `probe` builds whatever the caller needs on a backend (a session, in
/// practice). Under [`BackendPreference::Auto`] every failure but the last is
/// logged and skipped. Under an explicit preference the single candidate's
/// failure is returned: `Unavailable` becomes `BackendUnavailable`, `Load`
/// becomes `ModelLoad`.
pub fn resolve_backend<T, F>(
    preference: BackendPreference,
    mut probe: F,
) -> EmbeddingResult<(ExecutionBackend, T)>
where
    F: FnMut(ExecutionBackend) -> Result<T, ProbeError>,
{
    let candidates = preference.candidates();
    let mut last_err = None;

    for (index, &backend) in candidates.iter().enumerate() {
        info!("Attempting {} execution backend", backend);
        match probe(backend) {
            Ok(value) => {
                info!("{} execution backend initialized", backend);
                return Ok((backend, value));
            }
            Err(err) => {
                let is_last = index + 1 == candidates.len();
                if preference.is_automatic() && !is_last {
                    warn!("{} execution backend failed: {:?}", backend, err);
                    warn!("Falling back to next execution backend");
                }
                last_err = Some((backend, err));
            }
        }
    }

    match last_err {
        Some((backend, ProbeError::Unavailable(reason))) => {
            Err(EmbeddingError::BackendUnavailable {
                backend: backend.to_string(),
                reason,
            })
        }
        Some((_, ProbeError::Load(reason))) => Err(EmbeddingError::ModelLoad(reason)),
        None => Err(EmbeddingError::Configuration(
            "no execution backend candidates".to_string(),
        )),
    }
}
