// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use semantic_search_node::{
    api::{start_server, AppState},
    config::Settings,
    embeddings::ModelHandle,
    vectorstore::ensure_collections,
};
use std::{env, sync::Arc};
use tokio::signal;
use tracing::{error, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let settings = Settings::from_env().context("Invalid configuration")?;

    println!("🚀 Starting {}...\n", settings.app_name);
    println!("📦 Version: {}", env!("CARGO_PKG_VERSION"));
    println!();

    let store = settings
        .vector_store()
        .context("Failed to configure vector store")?;

    println!("🧠 Loading embedding model from {}...", settings.model_dir.display());
    let model = Arc::new(ModelHandle::new());
    match model.load(settings.embedding_config()).await {
        Ok(service) => {
            println!(
                "✅ Model {} ready on {} (dimension {})",
                service.model_name(),
                service.backend().as_str(),
                service.dimension()
            );
        }
        Err(e) => {
            error!("Embedding model failed to load: {}", e);
            eprintln!("❌ Failed to load embedding model [{}]: {}", e.error_code(), e);
            std::process::exit(1);
        }
    }

    match ensure_collections(store.as_ref(), &settings.schemas()).await {
        Ok(created) if created.is_empty() => println!("✅ Collections ready"),
        Ok(created) => println!("✅ Created collections: {}", created.join(", ")),
        Err(e) => {
            warn!("Could not ensure collections: {}", e);
            println!("⚠️  Vector store unreachable at startup: {}", e);
            println!("   /ingest and /query will fail until it is available");
        }
    }

    let addr = settings.bind_address();
    let state = AppState::new(settings, model, store);

    println!("\n🌐 API server on http://{}", addr);
    println!("   GET  /healthz");
    println!("   POST /v1/embed");
    println!("   POST /ingest/{{collection}}");
    println!("   POST /query");

    tokio::select! {
        result = start_server(state) => result.context("API server stopped")?,
        _ = signal::ctrl_c() => println!("\n⏹️  Shutting down..."),
    }

    Ok(())
}
