// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! POST /ingest/:collection

pub mod handler;

pub use handler::{ingest_handler, IngestResponse};
