// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::Args;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use super::load_service;
use crate::api::QueryResponse;
use crate::config::Settings;
use crate::embeddings::EmbeddingService;
use crate::vectorstore::{CollectionKind, CollectionSchema, SearchHit, SearchRequest, VectorStore};

/// Sample queries run when no `--query` is given
pub const SAMPLE_QUERIES: [(CollectionKind, &[&str]); 2] = [
    (
        CollectionKind::HelpSupport,
        &[
            "How do I reset my password?",
            "What are the security best practices?",
            "How to make mobile deposits?",
            "What are the fees for account maintenance?",
        ],
    ),
    (
        CollectionKind::Services,
        &[
            "I need a savings account with high interest",
            "Looking for credit cards with travel rewards",
            "Need information about mortgage loans",
            "What investment options do you offer?",
        ],
    ),
];

const PREVIEW_CHARS: usize = 150;

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// `help_support` or `services`; required with `--query`
    #[arg(long)]
    pub collection: Option<String>,

    #[arg(long)]
    pub query: Option<String>,

    #[arg(long, default_value_t = 3)]
    pub page_size: usize,

    /// Fuse dense results with BM25 text matches (Milvus collections with hybrid search)
    #[arg(long)]
    pub hybrid: bool,

    /// Base URL of a running node; queries in-process when omitted
    #[arg(long, env = "SEMANTIC_SEARCH_API")]
    pub api: Option<String>,
}

enum Target {
    Api(reqwest::Client, String),
    Direct(Arc<EmbeddingService>, Arc<dyn VectorStore>),
}

pub async fn query(settings: &Settings, args: QueryArgs) -> Result<()> {
    let queries: Vec<(CollectionKind, String)> = match (&args.query, &args.collection) {
        (Some(q), Some(c)) => vec![(c.parse()?, q.clone())],
        (Some(_), None) => {
            return Err(anyhow!("--query requires --collection"));
        }
        (None, _) => {
            println!("🔍 Running sample queries...");
            SAMPLE_QUERIES
                .iter()
                .flat_map(|(kind, qs)| qs.iter().map(move |q| (*kind, q.to_string())))
                .collect()
        }
    };

    let target = match args.api.as_deref() {
        Some(api) => Target::Api(
            reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()?,
            format!("{}/query", api.trim_end_matches('/')),
        ),
        None => Target::Direct(load_service(settings).await?, settings.vector_store()?),
    };

    for (kind, text) in queries {
        println!("\nQuerying {} for: '{}'", kind, text);
        let hits = match &target {
            Target::Api(client, url) => {
                query_via_api(client, url, kind, &text, args.page_size, args.hybrid).await
            }
            Target::Direct(service, store) => {
                let schema = settings.schema(kind);
                query_direct(service, store.as_ref(), &schema, &text, args.page_size, args.hybrid)
                    .await
            }
        };
        match hits {
            Ok(hits) => print_hits(kind, &hits),
            Err(e) => println!("❌ Query failed: {}", e),
        }
        println!("\n{}", "-".repeat(50));
    }

    println!("\n✅ Queries complete");
    Ok(())
}

async fn query_via_api(
    client: &reqwest::Client,
    url: &str,
    kind: CollectionKind,
    text: &str,
    page_size: usize,
    hybrid: bool,
) -> Result<Vec<SearchHit>> {
    let resp = client
        .post(url)
        .json(&json!({
            "collection": kind.as_str(),
            "query": text,
            "page": 1,
            "page_size": page_size,
            "hybrid": hybrid,
        }))
        .send()
        .await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(anyhow!("{}: {}", status, body));
    }
    let body: QueryResponse = resp.json().await?;
    Ok(body.results)
}

async fn query_direct(
    service: &Arc<EmbeddingService>,
    store: &dyn VectorStore,
    schema: &CollectionSchema,
    text: &str,
    page_size: usize,
    hybrid: bool,
) -> Result<Vec<SearchHit>> {
    let vector = service.embed_query(text)?;
    let request = SearchRequest {
        page_size,
        ..SearchRequest::default()
    };
    request.validate()?;
    let hits = if hybrid {
        store.hybrid_search(schema, &vector, text, &request).await?
    } else {
        store.search(schema, &vector, &request).await?
    };
    Ok(hits)
}

fn field<'a>(hit: &'a SearchHit, name: &str) -> &'a str {
    hit.fields.get(name).and_then(|v| v.as_str()).unwrap_or("N/A")
}

fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        format!("{}...", text.chars().take(PREVIEW_CHARS).collect::<String>())
    } else {
        text.to_string()
    }
}

fn print_hits(kind: CollectionKind, hits: &[SearchHit]) {
    println!("Found {} results:", hits.len());
    for (i, hit) in hits.iter().enumerate() {
        println!("\n--- Result {} (distance: {:.4}) ---", i + 1, hit.distance);
        match kind {
            CollectionKind::HelpSupport => {
                println!("Title: {}", field(hit, "title"));
                println!("URL: {}", field(hit, "url"));
                println!("Tags: {}", field(hit, "tags"));
                println!("Content: {}", preview(field(hit, "content")));
            }
            CollectionKind::Services => {
                println!("Name: {}", field(hit, "name"));
                println!("Intent: {}", field(hit, "intent_entity"));
                println!("URL: {}", field(hit, "url"));
                println!("Description: {}", preview(field(hit, "description")));
            }
        }
    }
}
