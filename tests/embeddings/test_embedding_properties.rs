// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Output properties of the embedding pipeline, checked against a fake encoder

use crate::common::{test_service, TEST_DIM};
use semantic_search_node::embeddings::EmbeddingError;

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

#[test]
fn test_one_vector_per_text_with_configured_dimension() {
    let service = test_service();
    let texts = [
        "How do I reset my password?",
        "open a savings account",
        "credit card travel rewards",
    ];
    let vectors = service.embed_documents(&texts).unwrap();
    assert_eq!(vectors.len(), texts.len());
    for v in &vectors {
        assert_eq!(v.len(), TEST_DIM);
    }
}

#[test]
fn test_vectors_have_unit_norm() {
    let service = test_service();
    let vectors = service
        .embed_documents(&["mortgage loan", "mobile deposit fees", "login"])
        .unwrap();
    for v in vectors {
        assert!((norm(&v) - 1.0).abs() < 1e-5, "norm was {}", norm(&v));
    }
}

#[test]
fn test_empty_input_gives_empty_output() {
    let service = test_service();
    let empty: [&str; 0] = [];
    assert!(service.embed_documents(&empty).unwrap().is_empty());
}

#[test]
fn test_position_in_batch_does_not_change_vector() {
    let service = test_service();
    let a = "reset my password";
    let b = "high interest savings account";
    let first = service.embed_documents(&[a, b]).unwrap();
    let swapped = service.embed_documents(&[b, a]).unwrap();
    assert_eq!(first[0], swapped[1]);
    assert_eq!(first[1], swapped[0]);
}

#[test]
fn test_same_text_twice_is_identical() {
    let service = test_service();
    let vectors = service
        .embed_documents(&["open a savings account", "open a savings account"])
        .unwrap();
    assert_eq!(vectors[0], vectors[1]);
    assert_eq!(
        service.embed_query("open a savings account").unwrap(),
        vectors[0]
    );
}

#[test]
fn test_padding_from_longer_neighbour_is_ignored() {
    let service = test_service();
    let short = "login";
    let long = "how do i reset my password for mobile deposit and credit card travel rewards";
    let alone = service.embed_query(short).unwrap();
    let batched = service.embed_documents(&[short, long]).unwrap();
    for (x, y) in alone.iter().zip(&batched[0]) {
        assert!((x - y).abs() < 1e-6);
    }
}

#[test]
fn test_different_texts_differ() {
    let service = test_service();
    let vectors = service
        .embed_documents(&["mortgage loan", "reset my password"])
        .unwrap();
    assert_ne!(vectors[0], vectors[1]);
}

#[test]
fn test_token_counts_follow_text_length() {
    let service = test_service();
    let embedded = service
        .embed_with_token_counts(&["login", "reset my password"])
        .unwrap();
    assert_eq!(embedded[0].token_count, 1);
    assert_eq!(embedded[1].token_count, 3);
}

#[test]
fn test_verify_rejects_wrong_dimension() {
    use crate::common::{test_config, FakeEncoder, VOCAB_JSON};
    use semantic_search_node::embeddings::{EmbeddingService, TextTokenizer};

    let tokenizer = TextTokenizer::from_json(VOCAB_JSON).unwrap();
    let service = EmbeddingService::from_parts(
        tokenizer,
        Box::new(FakeEncoder::new(8)),
        test_config(TEST_DIM),
    );
    match service.verify() {
        Err(EmbeddingError::DimensionMismatch { expected, actual }) => {
            assert_eq!(expected, TEST_DIM);
            assert_eq!(actual, 8);
        }
        other => panic!("expected DimensionMismatch, got {:?}", other),
    }
}

#[tokio::test]
async fn test_blocking_embed_matches_sync_path() {
    let service = std::sync::Arc::new(test_service());
    let sync = service.embed_query("savings account").unwrap();
    let embedded = service
        .clone()
        .embed_blocking(vec!["savings account".to_string()])
        .await
        .unwrap();
    assert_eq!(embedded[0].vector, sync);
}
