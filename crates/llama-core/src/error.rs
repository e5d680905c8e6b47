//! Error types for Llama Core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid snapshot JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
