//! Runtime metadata store
//!
//! Serves the snapshot bundled at build time and replaces it with a copy from
//! the live API once it goes stale. Concurrent callers of
//! [`MetadataStore::refresh_if_stale`] share a single in-flight refresh; the
//! moka entry for the unit key doubles as the TTL clock. A failed refresh
//! leaves the previous snapshot in place and is retried on the next call.
//!
//! The store is per process. Separate instances keep separate clocks.

use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use llama_core::{ChainMap, MetadataSnapshot, ProtocolMap};
use moka::future::Cache;

use crate::config::RefreshConfig;
use crate::error::Result;
use crate::fetch::UpstreamClient;
use crate::writer::read_snapshot;

struct Served {
    snapshot: Arc<MetadataSnapshot>,
    refreshed_at: Option<DateTime<Utc>>,
}

pub struct MetadataStore {
    client: UpstreamClient,
    config: RefreshConfig,
    served: RwLock<Served>,
    refreshes: Cache<(), Arc<MetadataSnapshot>>,
}

impl MetadataStore {
    pub fn new(snapshot: MetadataSnapshot, client: UpstreamClient, config: RefreshConfig) -> Self {
        let refreshes = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(config.ttl_seconds))
            .build();

        Self {
            client,
            config,
            served: RwLock::new(Served {
                snapshot: Arc::new(snapshot),
                refreshed_at: None,
            }),
            refreshes,
        }
    }

    /// Start from the snapshot files written by the build.
    pub async fn load(dir: &Path, client: UpstreamClient, config: RefreshConfig) -> Result<Self> {
        let snapshot = read_snapshot(dir).await?;
        tracing::info!(
            dir = %dir.display(),
            protocols = snapshot.protocols.len(),
            chains = snapshot.chains.len(),
            "Loaded bundled metadata"
        );
        Ok(Self::new(snapshot, client, config))
    }

    pub fn current(&self) -> Arc<MetadataSnapshot> {
        let served = self.served.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&served.snapshot)
    }

    /// Time of the last successful refresh; `None` while still serving the
    /// bundled snapshot.
    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        let served = self.served.read().unwrap_or_else(|e| e.into_inner());
        served.refreshed_at
    }

    /// Refresh from the live API if the TTL has lapsed, then return whatever
    /// is being served.
    pub async fn refresh_if_stale(&self) -> Arc<MetadataSnapshot> {
        if let Err(e) = self.refreshes.try_get_with((), self.fetch_live()).await {
            tracing::warn!(error = %e, "Metadata refresh failed, serving previous snapshot");
        }
        self.current()
    }

    async fn fetch_live(&self) -> Result<Arc<MetadataSnapshot>> {
        let protocols: ProtocolMap = self.client.get_json(&self.config.protocols_url).await?;
        let chains: ChainMap = self.client.get_json(&self.config.chains_url).await?;
        let snapshot = Arc::new(MetadataSnapshot { protocols, chains });

        let mut served = self.served.write().unwrap_or_else(|e| e.into_inner());
        served.snapshot = Arc::clone(&snapshot);
        served.refreshed_at = Some(Utc::now());

        tracing::info!(
            protocols = snapshot.protocols.len(),
            chains = snapshot.chains.len(),
            "Metadata refreshed from live API"
        );
        Ok(snapshot)
    }
}
