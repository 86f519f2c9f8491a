// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Collection schemas, index settings and the record/search types shared by
//! every store implementation

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::error::{StoreResult, VectorStoreError};

/// Name of the FLOAT_VECTOR field in every collection
pub const VECTOR_FIELD: &str = "embedding";

/// Largest `offset + limit` a search may reach
pub const MAX_RESULT_WINDOW: usize = 16384;

pub const MAX_PAGE_SIZE: usize = 100;

/// Analyzed VARCHAR holding the embedded text of a hybrid collection
pub const TEXT_FIELD: &str = "text";

/// Longest embedded text; covers title plus content, or name, description and intent
pub const TEXT_MAX_LENGTH: usize = 4096;

/// SPARSE_FLOAT_VECTOR filled server-side from [`TEXT_FIELD`]
pub const SPARSE_FIELD: &str = "text_sparse";

/// Milvus BM25 function mapping [`TEXT_FIELD`] to [`SPARSE_FIELD`]
pub const BM25_FUNCTION: &str = "text_bm25_emb";

/// A VARCHAR column and its length limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub max_length: usize,
}

const HELP_SUPPORT_FIELDS: &[FieldSpec] = &[
    FieldSpec { name: "url", max_length: 500 },
    FieldSpec { name: "title", max_length: 500 },
    FieldSpec { name: "content", max_length: 2000 },
    FieldSpec { name: "tags", max_length: 500 },
];

const SERVICES_FIELDS: &[FieldSpec] = &[
    FieldSpec { name: "url", max_length: 500 },
    FieldSpec { name: "name", max_length: 500 },
    FieldSpec { name: "description", max_length: 2000 },
    FieldSpec { name: "intent_entity", max_length: 500 },
];

/// The two document collections this service manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    HelpSupport,
    Services,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 2] = [CollectionKind::HelpSupport, CollectionKind::Services];

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::HelpSupport => "help_support",
            CollectionKind::Services => "services",
        }
    }

    pub fn primary_key(&self) -> &'static str {
        match self {
            CollectionKind::HelpSupport => "id",
            CollectionKind::Services => "service_id",
        }
    }

    /// Scalar columns, excluding the primary key and the vector
    pub fn scalar_fields(&self) -> &'static [FieldSpec] {
        match self {
            CollectionKind::HelpSupport => HELP_SUPPORT_FIELDS,
            CollectionKind::Services => SERVICES_FIELDS,
        }
    }

    /// Primary key followed by every scalar column
    pub fn default_output_fields(&self) -> Vec<String> {
        std::iter::once(self.primary_key())
            .chain(self.scalar_fields().iter().map(|f| f.name))
            .map(str::to_string)
            .collect()
    }

    pub fn has_field(&self, name: &str) -> bool {
        name == self.primary_key() || self.scalar_fields().iter().any(|f| f.name == name)
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionKind {
    type Err = VectorStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "help_support" => Ok(CollectionKind::HelpSupport),
            "services" => Ok(CollectionKind::Services),
            other => Err(VectorStoreError::UnknownCollection(other.to_string())),
        }
    }
}

/// Primary key length limit shared by both collections
pub const PRIMARY_KEY_MAX_LENGTH: usize = 100;

/// ANN index built on the vector field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    IvfFlat,
    Hnsw,
    AutoIndex,
}

impl IndexType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexType::IvfFlat => "IVF_FLAT",
            IndexType::Hnsw => "HNSW",
            IndexType::AutoIndex => "AUTOINDEX",
        }
    }

    /// Build parameters passed alongside `index_type`
    pub fn build_params(&self) -> Map<String, Value> {
        let params = match self {
            IndexType::IvfFlat => json!({"nlist": 1024}),
            IndexType::Hnsw => json!({"M": 16, "efConstruction": 200}),
            IndexType::AutoIndex => json!({}),
        };
        match params {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    /// Search parameters used when the request supplies none
    pub fn default_search_params(&self) -> Map<String, Value> {
        let params = match self {
            IndexType::IvfFlat => json!({"nprobe": 16}),
            IndexType::Hnsw => json!({"ef": 64}),
            IndexType::AutoIndex => json!({}),
        };
        match params {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

impl FromStr for IndexType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IVF_FLAT" => Ok(IndexType::IvfFlat),
            "HNSW" => Ok(IndexType::Hnsw),
            "AUTOINDEX" => Ok(IndexType::AutoIndex),
            other => Err(format!(
                "unknown index type '{}' (expected IVF_FLAT, HNSW or AUTOINDEX)",
                other
            )),
        }
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Distance metric for the vector index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    L2,
    Ip,
    Cosine,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::L2 => "L2",
            MetricType::Ip => "IP",
            MetricType::Cosine => "COSINE",
        }
    }

    /// L2 ranks ascending; IP and COSINE rank descending
    pub fn higher_is_closer(&self) -> bool {
        !matches!(self, MetricType::L2)
    }

    /// Score between two equal-length vectors under this metric
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            MetricType::L2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
            MetricType::Ip => a.iter().zip(b).map(|(x, y)| x * y).sum(),
            MetricType::Cosine => {
                let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
                let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
                if na == 0.0 || nb == 0.0 {
                    0.0
                } else {
                    dot / (na * nb)
                }
            }
        }
    }
}

impl FromStr for MetricType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L2" => Ok(MetricType::L2),
            "IP" => Ok(MetricType::Ip),
            "COSINE" => Ok(MetricType::Cosine),
            other => Err(format!(
                "unknown metric type '{}' (expected L2, IP or COSINE)",
                other
            )),
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named collection of one kind with its vector dimension
///
/// A hybrid collection also stores the embedded text with a BM25 sparse
/// vector next to it, so it can be searched on dense and lexical matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSchema {
    pub name: String,
    pub kind: CollectionKind,
    pub dimension: usize,
    pub hybrid: bool,
}

impl CollectionSchema {
    pub fn new(name: impl Into<String>, kind: CollectionKind, dimension: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            dimension,
            hybrid: false,
        }
    }

    pub fn with_hybrid(mut self, hybrid: bool) -> Self {
        self.hybrid = hybrid;
        self
    }

    /// Field list in the Milvus REST v2 `schema.fields` shape
    pub fn milvus_fields(&self) -> Vec<Value> {
        let mut fields = vec![json!({
            "fieldName": self.kind.primary_key(),
            "dataType": "VarChar",
            "isPrimary": true,
            "elementTypeParams": {"max_length": PRIMARY_KEY_MAX_LENGTH.to_string()},
        })];
        fields.extend(self.kind.scalar_fields().iter().map(|f| {
            json!({
                "fieldName": f.name,
                "dataType": "VarChar",
                "elementTypeParams": {"max_length": f.max_length.to_string()},
            })
        }));
        fields.push(json!({
            "fieldName": VECTOR_FIELD,
            "dataType": "FloatVector",
            "elementTypeParams": {"dim": self.dimension.to_string()},
        }));
        if self.hybrid {
            fields.push(json!({
                "fieldName": TEXT_FIELD,
                "dataType": "VarChar",
                "elementTypeParams": {
                    "max_length": TEXT_MAX_LENGTH.to_string(),
                    "enable_analyzer": true,
                },
            }));
            fields.push(json!({
                "fieldName": SPARSE_FIELD,
                "dataType": "SparseFloatVector",
            }));
        }
        fields
    }

    /// Full `collections/create` request body
    pub fn milvus_create_body(&self, index: IndexType, metric: MetricType) -> Value {
        let mut params = index.build_params();
        params.insert("index_type".to_string(), json!(index.as_str()));
        let mut body = json!({
            "collectionName": self.name,
            "schema": {
                "autoId": false,
                "enableDynamicField": false,
                "fields": self.milvus_fields(),
            },
            "indexParams": [{
                "fieldName": VECTOR_FIELD,
                "indexName": format!("{}_index", VECTOR_FIELD),
                "metricType": metric.as_str(),
                "params": params,
            }],
        });
        if self.hybrid {
            body["schema"]["functions"] = json!([{
                "name": BM25_FUNCTION,
                "type": "BM25",
                "inputFieldNames": [TEXT_FIELD],
                "outputFieldNames": [SPARSE_FIELD],
                "params": {},
            }]);
            if let Some(indexes) = body["indexParams"].as_array_mut() {
                indexes.push(json!({
                    "fieldName": SPARSE_FIELD,
                    "indexName": format!("{}_index", SPARSE_FIELD),
                    "metricType": "BM25",
                    "params": {"index_type": "SPARSE_INVERTED_INDEX"},
                }));
            }
        }
        body
    }
}

/// One document ready to upsert
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    /// Scalar columns by name
    pub fields: BTreeMap<String, String>,
    pub embedding: Vec<f32>,
    /// Embedded text, written only to hybrid collections
    pub text: Option<String>,
}

impl VectorRecord {
    /// Flat row keyed by column name, as the database stores it
    pub fn to_row(&self, kind: CollectionKind) -> Value {
        let mut row = Map::new();
        row.insert(kind.primary_key().to_string(), json!(self.id));
        for (name, value) in &self.fields {
            row.insert(name.clone(), json!(value));
        }
        row.insert(VECTOR_FIELD.to_string(), json!(self.embedding));
        if let Some(text) = &self.text {
            row.insert(TEXT_FIELD.to_string(), json!(text));
        }
        Value::Object(row)
    }

    /// Checks the key and every scalar column against the collection's limits
    pub fn validate(&self, kind: CollectionKind) -> StoreResult<()> {
        if self.id.trim().is_empty() {
            return Err(VectorStoreError::InvalidRequest(format!(
                "{} must not be empty",
                kind.primary_key()
            )));
        }
        if self.id.chars().count() > PRIMARY_KEY_MAX_LENGTH {
            return Err(VectorStoreError::InvalidRequest(format!(
                "{} exceeds {} characters",
                kind.primary_key(),
                PRIMARY_KEY_MAX_LENGTH
            )));
        }
        for spec in kind.scalar_fields() {
            let value = self.fields.get(spec.name).ok_or_else(|| {
                VectorStoreError::InvalidRequest(format!("missing field '{}'", spec.name))
            })?;
            if value.chars().count() > spec.max_length {
                return Err(VectorStoreError::InvalidRequest(format!(
                    "field '{}' of {} exceeds {} characters",
                    spec.name, self.id, spec.max_length
                )));
            }
        }
        if let Some(text) = &self.text {
            if text.chars().count() > TEXT_MAX_LENGTH {
                return Err(VectorStoreError::InvalidRequest(format!(
                    "text of {} exceeds {} characters",
                    self.id, TEXT_MAX_LENGTH
                )));
            }
        }
        if self.embedding.iter().any(|x| !x.is_finite()) {
            return Err(VectorStoreError::InvalidRequest(format!(
                "embedding of {} contains NaN or infinite values",
                self.id
            )));
        }
        Ok(())
    }
}

/// Paging, filtering and projection for one similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub page: usize,
    pub page_size: usize,
    pub metadata_filter: Option<Map<String, Value>>,
    pub output_fields: Option<Vec<String>>,
    pub search_params: Option<Map<String, Value>>,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 5,
            metadata_filter: None,
            output_fields: None,
            search_params: None,
        }
    }
}

impl SearchRequest {
    pub fn validate(&self) -> StoreResult<()> {
        if self.page == 0 {
            return Err(VectorStoreError::InvalidRequest(
                "page must be at least 1".to_string(),
            ));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(VectorStoreError::InvalidRequest(format!(
                "page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        let window = self.offset().saturating_add(self.page_size);
        if window > MAX_RESULT_WINDOW {
            return Err(VectorStoreError::InvalidRequest(format!(
                "page {} with page_size {} exceeds the {} result window",
                self.page, self.page_size, MAX_RESULT_WINDOW
            )));
        }
        Ok(())
    }

    /// Rows skipped before this page
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// Requested projection, or every scalar column of `kind`
    pub fn resolved_output_fields(&self, kind: CollectionKind) -> Vec<String> {
        match &self.output_fields {
            Some(fields) if !fields.is_empty() => fields.clone(),
            _ => kind.default_output_fields(),
        }
    }

    /// Caller overrides layered on the index defaults
    pub fn resolved_search_params(&self, index: IndexType) -> Map<String, Value> {
        let mut params = index.default_search_params();
        if let Some(overrides) = &self.search_params {
            for (k, v) in overrides {
                params.insert(k.clone(), v.clone());
            }
        }
        params
    }
}

/// One search result: the distance plus the projected fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub distance: f32,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}
