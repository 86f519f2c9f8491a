// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! POST /query: semantic search over one collection

pub mod handler;
pub mod request;
pub mod response;

pub use handler::query_handler;
pub use request::QueryRequest;
pub use response::QueryResponse;
