// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Environment configuration
//!
//! Every setting has a default; binaries load `.env` with `dotenv` before
//! calling [`Settings::from_env`].

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::embeddings::{BackendPreference, EmbeddingConfig};
use crate::vectorstore::{
    CollectionKind, CollectionSchema, IndexType, MemoryStore, MetricType, MilvusConfig,
    MilvusStore, StoreResult, VectorStore, VectorStoreError,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration error: {key}={value:?}: {reason}")]
pub struct ConfigError {
    pub key: String,
    pub value: String,
    pub reason: String,
}

/// Which [`VectorStore`](crate::vectorstore::VectorStore) backend to build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorBackend {
    Milvus,
    Memory,
}

impl FromStr for VectorBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "milvus" => Ok(VectorBackend::Milvus),
            "memory" => Ok(VectorBackend::Memory),
            other => Err(format!("unknown vector backend '{}' (expected milvus or memory)", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub app_name: String,
    pub host: String,
    pub port: u16,

    pub model_dir: PathBuf,
    pub model_filename: Option<String>,
    pub embedding_dim: usize,
    pub max_length: usize,
    pub ort_provider: BackendPreference,
    pub ort_intra_threads: usize,

    pub vector_backend: VectorBackend,
    pub milvus_uri: Option<String>,
    pub milvus_host: String,
    pub milvus_port: u16,
    pub milvus_token: Option<String>,
    pub index_type: IndexType,
    pub metric_type: MetricType,
    /// Create collections with a BM25 text field so `/query` can run hybrid search
    pub hybrid_search: bool,

    pub help_collection: String,
    pub services_collection: String,
    pub cors_allow_origins: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "semantic-search-milvus".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            model_dir: PathBuf::from("/models/all-MiniLM-L6-v2-onnx"),
            model_filename: None,
            embedding_dim: 384,
            max_length: 256,
            ort_provider: BackendPreference::Auto,
            ort_intra_threads: 4,
            vector_backend: VectorBackend::Milvus,
            milvus_uri: None,
            milvus_host: "localhost".to_string(),
            milvus_port: 19530,
            milvus_token: None,
            index_type: IndexType::IvfFlat,
            metric_type: MetricType::L2,
            hybrid_search: true,
            help_collection: "help_support".to_string(),
            services_collection: "services".to_string(),
            cors_allow_origins: vec!["*".to_string()],
        }
    }
}

fn parse<T, E>(key: &str, raw: String) -> Result<T, ConfigError>
where
    T: FromStr<Err = E>,
    E: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError {
        key: key.to_string(),
        value: raw.clone(),
        reason: e.to_string(),
    })
}

/// Unset and blank values are treated alike
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_empty(lookup(key));
        let mut s = Settings::default();

        if let Some(v) = get("APP_NAME") {
            s.app_name = v;
        }
        if let Some(v) = get("HOST") {
            s.host = v;
        }
        if let Some(v) = get("PORT") {
            s.port = parse("PORT", v)?;
        }
        if let Some(v) = get("MODEL_DIR") {
            s.model_dir = PathBuf::from(v);
        }
        s.model_filename = get("ONNX_MODEL_FILENAME");
        if let Some(v) = get("EMBEDDING_DIM") {
            s.embedding_dim = parse("EMBEDDING_DIM", v)?;
        }
        if let Some(v) = get("MAX_LENGTH") {
            s.max_length = parse("MAX_LENGTH", v)?;
        }
        if let Some(v) = get("ORT_PROVIDER") {
            s.ort_provider = parse("ORT_PROVIDER", v)?;
        }
        if let Some(v) = get("ORT_INTRA_THREADS") {
            s.ort_intra_threads = parse("ORT_INTRA_THREADS", v)?;
        }
        if let Some(v) = get("VECTOR_BACKEND") {
            s.vector_backend = parse("VECTOR_BACKEND", v)?;
        }
        s.milvus_uri = get("MILVUS_URI");
        if let Some(v) = get("MILVUS_HOST") {
            s.milvus_host = v;
        }
        if let Some(v) = get("MILVUS_PORT") {
            s.milvus_port = parse("MILVUS_PORT", v)?;
        }
        s.milvus_token = get("MILVUS_TOKEN");
        if let Some(v) = get("INDEX_TYPE") {
            s.index_type = parse("INDEX_TYPE", v)?;
        }
        if let Some(v) = get("METRIC_TYPE") {
            s.metric_type = parse("METRIC_TYPE", v)?;
        }
        if let Some(v) = get("HYBRID_SEARCH") {
            s.hybrid_search = parse("HYBRID_SEARCH", v.to_ascii_lowercase())?;
        }
        if let Some(v) = get("HELP_COLLECTION") {
            s.help_collection = v;
        }
        if let Some(v) = get("SERVICES_COLLECTION") {
            s.services_collection = v;
        }
        if let Some(v) = get("CORS_ALLOW_ORIGINS") {
            s.cors_allow_origins = v
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        for (key, value) in [("EMBEDDING_DIM", s.embedding_dim), ("MAX_LENGTH", s.max_length)] {
            if value == 0 {
                return Err(ConfigError {
                    key: key.to_string(),
                    value: "0".to_string(),
                    reason: "must be greater than 0".to_string(),
                });
            }
        }
        Ok(s)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `MILVUS_URI` if set, else `http://{MILVUS_HOST}:{MILVUS_PORT}`
    pub fn milvus_uri(&self) -> String {
        self.milvus_uri
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.milvus_host, self.milvus_port))
    }

    pub fn embedding_config(&self) -> EmbeddingConfig {
        EmbeddingConfig {
            model_dir: self.model_dir.clone(),
            model_filename: self.model_filename.clone(),
            embedding_dim: self.embedding_dim,
            max_length: self.max_length,
            backend: self.ort_provider,
            intra_threads: self.ort_intra_threads,
        }
    }

    pub fn milvus_config(&self) -> MilvusConfig {
        MilvusConfig {
            uri: self.milvus_uri(),
            token: self.milvus_token.clone(),
            index_type: self.index_type,
            metric_type: self.metric_type,
            timeout: Duration::from_secs(30),
        }
    }

    /// Builds the configured vector store backend
    pub fn vector_store(&self) -> StoreResult<Arc<dyn VectorStore>> {
        Ok(match self.vector_backend {
            VectorBackend::Milvus => Arc::new(MilvusStore::new(self.milvus_config())?),
            VectorBackend::Memory => Arc::new(MemoryStore::new(self.metric_type)),
        })
    }

    /// Configured collection name for `kind`
    pub fn collection_name(&self, kind: CollectionKind) -> &str {
        match kind {
            CollectionKind::HelpSupport => &self.help_collection,
            CollectionKind::Services => &self.services_collection,
        }
    }

    pub fn schema(&self, kind: CollectionKind) -> CollectionSchema {
        CollectionSchema::new(self.collection_name(kind), kind, self.embedding_dim)
            .with_hybrid(self.hybrid_search)
    }

    pub fn schemas(&self) -> Vec<CollectionSchema> {
        CollectionKind::ALL.iter().map(|&k| self.schema(k)).collect()
    }

    /// Schema for a collection type name as it appears in requests
    pub fn schema_for(&self, collection: &str) -> Result<CollectionSchema, VectorStoreError> {
        let kind: CollectionKind = collection.parse()?;
        Ok(self.schema(kind))
    }
}
