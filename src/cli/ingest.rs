// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::Args;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

use super::load_service;
use crate::api::IngestResponse;
use crate::config::Settings;
use crate::ingestion::{ingest_items, load_items};
use crate::vectorstore::ensure_collections;

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// `help_support` or `services`
    #[arg(long)]
    pub collection: String,

    /// `.json` array or `.jsonl` file of items
    #[arg(long)]
    pub data: PathBuf,

    /// Base URL of a running node; ingests in-process when omitted
    #[arg(long, env = "SEMANTIC_SEARCH_API")]
    pub api: Option<String>,
}

pub async fn ingest(settings: &Settings, args: IngestArgs) -> Result<()> {
    let schema = settings.schema_for(&args.collection)?;
    let items = load_items(&args.data)?;
    println!(
        "📄 Loaded {} items from {}",
        items.len(),
        args.data.display()
    );

    let response = match args.api.as_deref() {
        Some(api) => ingest_via_api(api, &args.collection, items).await?,
        None => {
            let service = load_service(settings).await?;
            let store = settings.vector_store()?;
            ensure_collections(store.as_ref(), std::slice::from_ref(&schema)).await?;
            let report = ingest_items(service, store.as_ref(), &schema, items).await?;
            IngestResponse {
                ingested: report.ingested,
                collection: report.collection,
                skipped_duplicates: report.skipped_duplicates,
            }
        }
    };

    println!(
        "✅ Ingested {} documents into {}",
        response.ingested, response.collection
    );
    if response.skipped_duplicates > 0 {
        println!("   Skipped {} duplicate items", response.skipped_duplicates);
    }
    Ok(())
}

async fn ingest_via_api(api: &str, collection: &str, items: Vec<Value>) -> Result<IngestResponse> {
    let url = format!("{}/ingest/{}", api.trim_end_matches('/'), collection);
    println!("🚀 Posting to {}...", url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(300))
        .build()?;
    let resp = client.post(&url).json(&items).send().await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(anyhow!("Ingest failed with {}: {}", status, body));
    }
    Ok(resp.json().await?)
}
