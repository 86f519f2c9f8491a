// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Document ingestion
//!
//! Raw JSON items -> typed documents -> one embedding pass -> one upsert.
//! Duplicate primary keys within one request are skipped; the first wins.
//! Every record is validated before the store is touched, so a failed
//! request writes nothing this layer can see.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::embeddings::{EmbeddingError, EmbeddingService};
use crate::vectorstore::{
    CollectionKind, CollectionSchema, VectorRecord, VectorStore, VectorStoreError,
};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Invalid item at index {index}: {message}")]
    InvalidItem { index: usize, message: String },

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Store(#[from] VectorStoreError),

    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },
}

/// A help/support page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelpSupportItem {
    pub id: String,
    pub url: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// A bank service entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicesItem {
    pub service_id: String,
    pub url: String,
    pub name: String,
    pub description: String,
    /// e.g. `account_opening-savings`
    pub intent_entity: String,
}

/// A validated item with the text to embed and the scalar columns to store
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub fields: BTreeMap<String, String>,
}

impl From<HelpSupportItem> for Document {
    fn from(item: HelpSupportItem) -> Self {
        let text = format!("{}\n\n{}", item.title, item.content);
        let tags = item.tags.unwrap_or_default().join(",");
        let fields = BTreeMap::from([
            ("url".to_string(), item.url),
            ("title".to_string(), item.title),
            ("content".to_string(), item.content),
            ("tags".to_string(), tags),
        ]);
        Self {
            id: item.id,
            text,
            fields,
        }
    }
}

impl From<ServicesItem> for Document {
    fn from(item: ServicesItem) -> Self {
        let text = format!("{}\n{}\n{}", item.name, item.description, item.intent_entity);
        let fields = BTreeMap::from([
            ("url".to_string(), item.url),
            ("name".to_string(), item.name),
            ("description".to_string(), item.description),
            ("intent_entity".to_string(), item.intent_entity),
        ]);
        Self {
            id: item.service_id,
            text,
            fields,
        }
    }
}

/// Parses raw items of `kind` into documents
pub fn parse_items(kind: CollectionKind, items: Vec<Value>) -> Result<Vec<Document>, IngestError> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let invalid = |e: serde_json::Error| IngestError::InvalidItem {
                index,
                message: e.to_string(),
            };
            let doc: Document = match kind {
                CollectionKind::HelpSupport => {
                    serde_json::from_value::<HelpSupportItem>(item).map_err(invalid)?.into()
                }
                CollectionKind::Services => {
                    serde_json::from_value::<ServicesItem>(item).map_err(invalid)?.into()
                }
            };
            if doc.id.trim().is_empty() {
                return Err(IngestError::InvalidItem {
                    index,
                    message: format!("{} must not be empty", kind.primary_key()),
                });
            }
            Ok(doc)
        })
        .collect()
}

/// Drops documents whose id was already seen; returns the kept docs and the skipped ids
pub fn dedupe(documents: Vec<Document>) -> (Vec<Document>, Vec<String>) {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(documents.len());
    let mut skipped = Vec::new();
    for doc in documents {
        if seen.insert(doc.id.clone()) {
            kept.push(doc);
        } else {
            skipped.push(doc.id);
        }
    }
    (kept, skipped)
}

/// Reads items from a `.jsonl` file (one object per line) or a `.json` array
pub fn load_items(path: &Path) -> Result<Vec<Value>, IngestError> {
    let io_err = |message: String| IngestError::Io {
        path: path.display().to_string(),
        message,
    };
    let content = std::fs::read_to_string(path).map_err(|e| io_err(e.to_string()))?;

    let is_jsonl = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("jsonl"))
        .unwrap_or(false);

    if is_jsonl {
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line).map_err(|e| io_err(format!("line {}: {}", n + 1, e)))
            })
            .collect()
    } else {
        match serde_json::from_str::<Value>(&content).map_err(|e| io_err(e.to_string()))? {
            Value::Array(items) => Ok(items),
            _ => Err(io_err("expected a JSON array of items".to_string())),
        }
    }
}

/// Outcome of one ingestion request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub collection: String,
    pub ingested: usize,
    pub skipped_duplicates: usize,
}

/// Validates, embeds and upserts `items` into `schema`'s collection
pub async fn ingest_items(
    service: Arc<EmbeddingService>,
    store: &dyn VectorStore,
    schema: &CollectionSchema,
    items: Vec<Value>,
) -> Result<IngestReport, IngestError> {
    let documents = parse_items(schema.kind, items)?;
    let (documents, skipped) = dedupe(documents);
    if !skipped.is_empty() {
        warn!(
            "Skipping {} duplicate {} values: {:?}",
            skipped.len(),
            schema.kind.primary_key(),
            skipped
        );
    }

    let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
    let embedded = service.embed_blocking(texts).await?;

    let records: Vec<VectorRecord> = documents
        .into_iter()
        .zip(embedded)
        .map(|(doc, e)| VectorRecord {
            id: doc.id,
            fields: doc.fields,
            embedding: e.vector,
            text: schema.hybrid.then_some(doc.text),
        })
        .collect();
    for record in &records {
        record.validate(schema.kind)?;
    }

    let ingested = if records.is_empty() {
        0
    } else {
        store.upsert(schema, &records).await?
    };

    info!("Ingested {} documents to {}", ingested, schema.name);
    Ok(IngestReport {
        collection: schema.name.clone(),
        ingested,
        skipped_duplicates: skipped.len(),
    })
}
