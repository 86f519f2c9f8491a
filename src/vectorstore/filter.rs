// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Scalar filter rendering
//!
//! A flat `metadata_filter` map becomes a boolean expression the database
//! evaluates before ranking:
//!
//! ```text
//! {"tags": "login", "id": ["a", "b"]}  =>  id in ["a", "b"] and tags == "login"
//! ```
//!
//! Clauses are emitted in sorted key order.

use serde_json::{Map, Value};

use super::error::{StoreResult, VectorStoreError};

/// Renders `filter` into an expression, `None` when the map is empty
pub fn render_filter(filter: &Map<String, Value>) -> StoreResult<Option<String>> {
    if filter.is_empty() {
        return Ok(None);
    }
    let mut entries: Vec<(&String, &Value)> = filter.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    let clauses = entries
        .into_iter()
        .map(|(field, value)| render_clause(field, value))
        .collect::<StoreResult<Vec<_>>>()?;
    Ok(Some(clauses.join(" and ")))
}

fn render_clause(field: &str, value: &Value) -> StoreResult<String> {
    if !is_identifier(field) {
        return Err(VectorStoreError::InvalidFilter(format!(
            "'{}' is not a valid field name",
            field
        )));
    }
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(VectorStoreError::InvalidFilter(format!(
                    "'{}' has an empty value list",
                    field
                )));
            }
            let literals = items
                .iter()
                .map(|v| render_literal(field, v))
                .collect::<StoreResult<Vec<_>>>()?;
            Ok(format!("{} in [{}]", field, literals.join(", ")))
        }
        scalar => Ok(format!("{} == {}", field, render_literal(field, scalar)?)),
    }
}

fn render_literal(field: &str, value: &Value) -> StoreResult<String> {
    match value {
        Value::String(s) => Ok(format!("\"{}\"", escape(s))),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Err(VectorStoreError::InvalidFilter(format!(
            "'{}' cannot be compared with null",
            field
        ))),
        Value::Array(_) | Value::Object(_) => Err(VectorStoreError::InvalidFilter(format!(
            "'{}' must be a string, number, boolean or a list of those",
            field
        ))),
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Whether `row` satisfies every clause of `filter`
///
/// Used by the in-memory store; mirrors [`render_filter`]'s semantics.
pub fn matches_filter(filter: &Map<String, Value>, row: &Map<String, Value>) -> StoreResult<bool> {
    for (field, expected) in filter {
        if !is_identifier(field) {
            return Err(VectorStoreError::InvalidFilter(format!(
                "'{}' is not a valid field name",
                field
            )));
        }
        let actual = row.get(field);
        let ok = match expected {
            Value::Array(items) => {
                if items.is_empty() {
                    return Err(VectorStoreError::InvalidFilter(format!(
                        "'{}' has an empty value list",
                        field
                    )));
                }
                items.iter().any(|v| actual == Some(v))
            }
            Value::Null | Value::Object(_) => {
                return Err(VectorStoreError::InvalidFilter(format!(
                    "'{}' must be a string, number, boolean or a list of those",
                    field
                )))
            }
            scalar => actual == Some(scalar),
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}
