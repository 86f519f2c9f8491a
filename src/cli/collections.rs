// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Args;

use crate::config::Settings;
use crate::vectorstore::ensure_collections;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Drop existing collections before creating them
    #[arg(long)]
    pub drop: bool,

    /// Only print the configuration
    #[arg(long)]
    pub check: bool,
}

pub async fn init_collections(settings: &Settings, args: InitArgs) -> Result<()> {
    print_settings(settings);
    if args.check {
        return Ok(());
    }

    let store = settings.vector_store()?;
    let schemas = settings.schemas();

    if args.drop {
        for schema in &schemas {
            if store.has_collection(&schema.name).await? {
                println!("🗑️  Dropping {}...", schema.name);
                store.drop_collection(&schema.name).await?;
            }
        }
    }

    let created = ensure_collections(store.as_ref(), &schemas).await?;
    for schema in &schemas {
        let state = if created.contains(&schema.name) {
            "created"
        } else {
            "already exists"
        };
        println!("  - Collection '{}' {}", schema.name, state);
    }
    println!("✅ Initialization complete");
    Ok(())
}

fn print_settings(settings: &Settings) {
    println!("\n📋 Configuration:");
    println!("  Vector Backend:      {:?}", settings.vector_backend);
    println!("  Milvus URI:          {}", settings.milvus_uri());
    println!("  Help Collection:     {}", settings.help_collection);
    println!("  Services Collection: {}", settings.services_collection);
    println!("  Index / Metric:      {} / {}", settings.index_type, settings.metric_type);
    println!("  Hybrid Search:       {}", settings.hybrid_search);
    println!("  Model Dir:           {}", settings.model_dir.display());
    println!(
        "  Model Filename:      {}",
        settings.model_filename.as_deref().unwrap_or("auto-detected")
    );
    println!("  ORT Provider:        {:?}", settings.ort_provider);
    println!("  Embedding Dim:       {}", settings.embedding_dim);
}
