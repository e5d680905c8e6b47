//! # Llama Core
//!
//! Data models and the flag-folding reducer behind the DefiLlama metadata
//! snapshot.
//!
//! This crate is pure: it takes already-decoded upstream datasets and turns
//! them into the `protocols` / `chains` capability maps. Fetching and writing
//! live in `llama-metadata`.

pub mod error;
pub mod fold;
pub mod identity;
pub mod models;
pub mod slug;
pub mod upstream;

pub use error::*;
pub use fold::*;
pub use identity::*;
pub use models::*;
pub use slug::*;
pub use upstream::*;
