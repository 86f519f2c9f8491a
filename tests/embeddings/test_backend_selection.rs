// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Backend preference resolution on a host without an accelerator

use semantic_search_node::embeddings::{
    resolve_backend, BackendPreference, EmbeddingError, ExecutionBackend, ProbeError,
};

/// Probe that behaves like a CPU-only machine
fn cpu_only(backend: ExecutionBackend) -> Result<&'static str, ProbeError> {
    match backend {
        ExecutionBackend::Cuda => Err(ProbeError::Unavailable(
            "CUDA execution provider is not available".to_string(),
        )),
        ExecutionBackend::Cpu => Ok("cpu-session"),
    }
}

#[test]
fn test_auto_falls_back_to_cpu() {
    let mut probed = Vec::new();
    let (backend, session) = resolve_backend(BackendPreference::Auto, |b| {
        probed.push(b);
        cpu_only(b)
    })
    .unwrap();
    assert_eq!(backend, ExecutionBackend::Cpu);
    assert_eq!(session, "cpu-session");
    assert_eq!(probed, vec![ExecutionBackend::Cuda, ExecutionBackend::Cpu]);
}

#[test]
fn test_explicit_cuda_is_unavailable() {
    let err = resolve_backend(BackendPreference::Cuda, cpu_only).unwrap_err();
    assert!(
        matches!(err, EmbeddingError::BackendUnavailable { .. }),
        "got {:?}",
        err
    );
    assert!(err.is_fatal());
}

#[test]
fn test_explicit_cpu_never_probes_cuda() {
    let mut probed = Vec::new();
    let (backend, _) = resolve_backend(BackendPreference::Cpu, |b| {
        probed.push(b);
        cpu_only(b)
    })
    .unwrap();
    assert_eq!(backend, ExecutionBackend::Cpu);
    assert_eq!(probed, vec![ExecutionBackend::Cpu]);
}

#[test]
fn test_model_load_failure_is_not_masked_as_unavailable() {
    let err = resolve_backend(BackendPreference::Auto, |_| -> Result<(), ProbeError> {
        Err(ProbeError::Load("invalid protobuf".to_string()))
    })
    .unwrap_err();
    assert!(matches!(err, EmbeddingError::ModelLoad(_)), "got {:?}", err);
}

#[test]
fn test_preference_aliases() {
    for (raw, expected) in [
        ("auto", BackendPreference::Auto),
        ("CPU", BackendPreference::Cpu),
        ("cuda", BackendPreference::Cuda),
        ("GPU", BackendPreference::Cuda),
        ("accelerated", BackendPreference::Cuda),
    ] {
        assert_eq!(raw.parse::<BackendPreference>().unwrap(), expected);
    }
    assert!(matches!(
        "TPU".parse::<BackendPreference>(),
        Err(EmbeddingError::Configuration(_))
    ));
}
