// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod collections;
pub mod ingest;
pub mod query;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;

use crate::config::Settings;
use crate::embeddings::{EmbeddingService, ModelHandle};

/// Semantic search node CLI
#[derive(Parser, Debug)]
#[command(name = "semantic-search-cli")]
#[command(version = "1.0.0")]
#[command(about = "Collection setup, ingestion and test queries for the semantic search node", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the configuration and create missing collections
    InitCollections(collections::InitArgs),

    /// Embed and upsert a JSON or JSONL file of items
    Ingest(ingest::IngestArgs),

    /// Run a query, or the sample queries for every collection
    Query(query::QueryArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let settings = Settings::from_env()?;
    match cli.command {
        Commands::InitCollections(args) => collections::init_collections(&settings, args).await,
        Commands::Ingest(args) => ingest::ingest(&settings, args).await,
        Commands::Query(args) => query::query(&settings, args).await,
    }
}

/// Loads the embedding model in-process for direct mode
async fn load_service(settings: &Settings) -> Result<Arc<EmbeddingService>> {
    println!("🔄 Loading embedding model from {}...", settings.model_dir.display());
    let handle = ModelHandle::new();
    let service = handle.load(settings.embedding_config()).await?;
    println!(
        "✅ Model {} ready on {} (dimension {})",
        service.model_name(),
        service.backend().as_str(),
        service.dimension()
    );
    Ok(service)
}
