//! # Llama Metadata
//!
//! Builds the DefiLlama protocol/chain capability snapshot from the upstream
//! APIs and serves it at runtime with a TTL refresh.
//!
//! - [`pipeline::run`] is the batch build behind the `build-metadata` binary.
//! - [`store::MetadataStore`] is the read side used by long-running consumers.

pub mod config;
pub mod endpoints;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod store;
pub mod writer;

pub use error::{MetadataError, Result};
