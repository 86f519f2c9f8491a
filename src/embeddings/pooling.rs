// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Attention-masked mean pooling and L2 normalization

use ndarray::{Array2, ArrayView2, ArrayView3, Axis};

use super::error::{EmbeddingError, EmbeddingResult};

/// Floor for the real-token count of a row
pub const MIN_MASK_SUM: f32 = 1e-9;

/// Added to the norm before dividing
pub const NORM_EPSILON: f32 = 1e-12;

/// Reduces `[batch, seq, hidden]` states to one unit vector per row.
///
/// Only positions with a non-zero mask contribute, so a row's result does not
/// depend on how much padding the rest of the batch forced onto it.
pub fn pool_and_normalize(
    hidden_states: ArrayView3<'_, f32>,
    attention_mask: ArrayView2<'_, i64>,
) -> EmbeddingResult<Vec<Vec<f32>>> {
    let pooled = mean_pool(hidden_states, attention_mask)?;
    Ok(pooled
        .rows()
        .into_iter()
        .map(|row| l2_normalize(row.to_vec()))
        .collect())
}

/// Masked mean over the sequence axis, `[batch, hidden]`
pub fn mean_pool(
    hidden_states: ArrayView3<'_, f32>,
    attention_mask: ArrayView2<'_, i64>,
) -> EmbeddingResult<Array2<f32>> {
    let (batch, seq_len, hidden_dim) = hidden_states.dim();
    if attention_mask.dim() != (batch, seq_len) {
        return Err(EmbeddingError::Failure(format!(
            "hidden states {:?} do not match attention mask {:?}",
            hidden_states.shape(),
            attention_mask.shape()
        )));
    }

    let mut pooled = Array2::<f32>::zeros((batch, hidden_dim));

    for (b, (states, mask)) in hidden_states
        .axis_iter(Axis(0))
        .zip(attention_mask.axis_iter(Axis(0)))
        .enumerate()
    {
        let mut sum_mask = 0.0f32;
        let mut row = pooled.row_mut(b);
        for (token, &m) in states.axis_iter(Axis(0)).zip(mask.iter()) {
            if m == 0 {
                continue;
            }
            let weight = m as f32;
            sum_mask += weight;
            row.scaled_add(weight, &token);
        }
        row /= sum_mask.max(MIN_MASK_SUM);
    }

    Ok(pooled)
}

/// Scales `v` to unit length; an all-zero vector stays zero
pub fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm + NORM_EPSILON;
    for x in &mut v {
        *x /= denom;
    }
    v
}
