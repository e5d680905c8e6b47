//! HTTP fetch layer for upstream JSON datasets
//!
//! Two modes share one client: direct, where every call goes to the network,
//! and over-cache, where a fresh copy on disk is reused instead. Nothing here
//! retries; a failed request or an undecodable body is returned to the caller.
//! The cache never fails a request: an unreadable entry is dropped and
//! refetched, and a failed cache write is only logged.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::config::FetchConfig;
use crate::error::{MetadataError, Result};
use crate::writer::write_atomic;

/// HTTP client for the DefiLlama APIs
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    cache: Option<ResponseCache>,
}

impl UpstreamClient {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("llama-metadata/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = config.cache_dir.as_ref().map(|dir| ResponseCache {
            dir: PathBuf::from(dir),
            ttl: Duration::from_secs(config.cache_ttl_seconds),
        });

        Ok(Self { client, cache })
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// GET `url` and decode the body as `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        if let Some(cache) = &self.cache {
            if let Some(body) = cache.read(url).await? {
                match decode(url, &body) {
                    Ok(value) => {
                        tracing::debug!(url = %url, "Serving upstream response from cache");
                        return Ok(value);
                    }
                    Err(e) => {
                        tracing::warn!(url = %url, error = %e, "Discarding unreadable cached response");
                        cache.remove(url).await;
                    }
                }
            }
        }

        let body = self.fetch(url).await?;
        let value = decode(url, &body)?;

        // only bodies that decoded are worth keeping
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.write(url, &body).await {
                tracing::warn!(url = %url, error = %e, "Failed to cache upstream response");
            }
        }

        Ok(value)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let started = Instant::now();
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(url = %url, status = status.as_u16(), "Upstream request failed");
            return Err(MetadataError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        tracing::debug!(
            url = %url,
            bytes = body.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fetched upstream dataset"
        );

        Ok(body.to_vec())
    }
}

fn decode<T: DeserializeOwned>(url: &str, body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|source| MetadataError::Decode {
        url: url.to_string(),
        source,
    })
}

/// On-disk copy of raw response bodies, one file per URL.
#[derive(Debug, Clone)]
struct ResponseCache {
    dir: PathBuf,
    ttl: Duration,
}

impl ResponseCache {
    fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(cache_file_name(url))
    }

    async fn read(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(url);
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let age = metadata.modified()?.elapsed().unwrap_or(Duration::ZERO);
        if age > self.ttl {
            tracing::debug!(
                path = %path.display(),
                age_secs = age.as_secs(),
                "Cached response expired"
            );
            return Ok(None);
        }

        Ok(Some(tokio::fs::read(&path).await?))
    }

    async fn write(&self, url: &str, body: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        write_atomic(&self.path_for(url), body).await
    }

    async fn remove(&self, url: &str) {
        let path = self.path_for(url);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove cached response")
            }
        }
    }
}

/// Map a URL onto a flat file name. Bytes outside `[A-Za-z0-9.-]` are
/// escaped as `_xx` hex, so distinct URLs never share a file.
fn cache_file_name(url: &str) -> String {
    let rest = url
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let mut name = String::with_capacity(rest.len() + 5);
    for byte in rest.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'.' {
            name.push(byte as char);
        } else {
            name.push_str(&format!("_{:02x}", byte));
        }
    }
    name.push_str(".json");
    name
}
