use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] llama_core::CoreError),
}

pub type Result<T> = std::result::Result<T, MetadataError>;
