// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Tests against a real all-MiniLM-L6-v2 export
//!
//! Run with `MODEL_DIR=/path/to/all-MiniLM-L6-v2-onnx cargo test -- --ignored`.

use semantic_search_node::embeddings::{
    BackendPreference, EmbeddingConfig, EmbeddingError, EmbeddingService, ExecutionBackend,
};
use std::path::PathBuf;

fn model_dir() -> PathBuf {
    std::env::var("MODEL_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/models/all-MiniLM-L6-v2-onnx"))
}

fn try_load(backend: BackendPreference) -> Result<EmbeddingService, EmbeddingError> {
    EmbeddingService::load(EmbeddingConfig {
        model_dir: model_dir(),
        backend,
        ..Default::default()
    })
}

fn load(backend: BackendPreference) -> EmbeddingService {
    try_load(backend).expect("Failed to load embedding model")
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[test]
#[ignore] // Requires model files
fn test_real_model_loads_on_cpu() {
    let service = load(BackendPreference::Cpu);
    assert_eq!(service.backend(), ExecutionBackend::Cpu);
    assert_eq!(service.dimension(), 384);
    assert_eq!(service.model_name(), "all-MiniLM-L6-v2");
}

#[test]
#[ignore] // Requires model files
fn test_real_model_explicit_cuda_is_gpu_or_unavailable() {
    // A valid graph never reports ModelLoad just because there is no GPU
    match try_load(BackendPreference::Cuda) {
        Ok(service) => assert_eq!(service.backend(), ExecutionBackend::Cuda),
        Err(EmbeddingError::BackendUnavailable { backend, .. }) => assert_eq!(backend, "CUDA"),
        Err(other) => panic!("expected CUDA or BackendUnavailable, got {:?}", other),
    }
}

#[test]
#[ignore] // Requires model files
fn test_real_model_batch_properties() {
    let service = load(BackendPreference::Auto);
    let short = "Reset password";
    let long = "Earn competitive interest on balances with our high-yield savings account, \
                with no monthly maintenance fees and free mobile deposits.";

    let alone = service.embed_query(short).unwrap();
    let batch = service.embed_documents(&[short, long]).unwrap();
    let swapped = service.embed_documents(&[long, short]).unwrap();

    for v in &batch {
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }
    for ((a, b), c) in alone.iter().zip(&batch[0]).zip(&swapped[1]) {
        assert!((a - b).abs() < 1e-4);
        assert!((a - c).abs() < 1e-4);
    }
}

#[test]
#[ignore] // Requires model files
fn test_real_model_ranks_related_text_higher() {
    let service = load(BackendPreference::Auto);
    let query = service.embed_query("How do I reset my password?").unwrap();
    let docs = service
        .embed_documents(&[
            "Forgot your password? Use the reset link on the login page.",
            "Compare our mortgage rates for first-time home buyers.",
        ])
        .unwrap();
    assert!(cosine(&query, &docs[0]) > cosine(&query, &docs[1]));
}
