// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! EmbedRequest type for POST /v1/embed

use crate::api::ApiError;
use serde::{Deserialize, Serialize};

pub const MAX_TEXTS: usize = 96;
pub const MAX_TEXT_CHARS: usize = 8192;

/// Request body for POST /v1/embed
///
/// ```json
/// { "texts": ["How do I reset my password?", "Open a savings account"] }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedRequest {
    /// Text strings to embed (1-96 items)
    pub texts: Vec<String>,
}

impl EmbedRequest {
    /// Validates the embed request
    ///
    /// # Validation Rules
    /// 1. **texts**: Must contain 1-96 items
    /// 2. **text length**: Each text must be at most 8192 characters
    /// 3. **whitespace**: Texts cannot be empty or whitespace-only
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.texts.is_empty() {
            return Err(ApiError::ValidationError {
                field: "texts".to_string(),
                message: "texts array must contain at least 1 item".to_string(),
            });
        }

        if self.texts.len() > MAX_TEXTS {
            return Err(ApiError::ValidationError {
                field: "texts".to_string(),
                message: format!(
                    "texts array cannot contain more than {} items (got {})",
                    MAX_TEXTS,
                    self.texts.len()
                ),
            });
        }

        for (index, text) in self.texts.iter().enumerate() {
            if text.trim().is_empty() {
                return Err(ApiError::ValidationError {
                    field: format!("texts[{}]", index),
                    message: "text cannot be empty or contain only whitespace".to_string(),
                });
            }

            let chars = text.chars().count();
            if chars > MAX_TEXT_CHARS {
                return Err(ApiError::ValidationError {
                    field: format!("texts[{}]", index),
                    message: format!(
                        "text cannot exceed {} characters (got {} characters)",
                        MAX_TEXT_CHARS, chars
                    ),
                });
            }
        }

        Ok(())
    }
}
