//! The metadata build: fetch every upstream dataset, fold, write.
//!
//! Fetches run one after another. Any failure other than the active-users
//! feed aborts the run before anything is written.

use std::path::Path;

use llama_core::{
    build_metadata, ActiveUsers, DimensionKind, DimensionOverview, MetadataSnapshot, UpstreamData,
    YieldPools,
};
use serde::de::DeserializeOwned;

use crate::config::AppConfig;
use crate::endpoints::Endpoints;
use crate::error::Result;
use crate::fetch::UpstreamClient;
use crate::writer::write_snapshot;

async fn fetch<T: DeserializeOwned>(
    client: &UpstreamClient,
    dataset: &str,
    url: &str,
) -> Result<T> {
    tracing::info!(dataset, "Fetching");
    client.get_json(url).await.map_err(|e| {
        tracing::error!(dataset, error = %e, "Failed to fetch dataset");
        e
    })
}

/// Fetch every dataset the build needs, sequentially.
pub async fn fetch_upstream(
    client: &UpstreamClient,
    endpoints: &Endpoints,
) -> Result<UpstreamData> {
    let listing = fetch(client, "protocols", &endpoints.protocols).await?;
    let yields: YieldPools = fetch(client, "yields", &endpoints.yield_pools).await?;
    let expenses = fetch(client, "expenses", &endpoints.expenses).await?;
    let treasuries = fetch(client, "treasuries", &endpoints.treasuries).await?;
    let liquidity = fetch(client, "liquidity", &endpoints.liquidity).await?;
    let hacks = fetch(client, "hacks", &endpoints.hacks).await?;
    let nft_marketplaces = fetch(client, "nft-marketplaces", &endpoints.nft_marketplaces).await?;
    let raises = fetch(client, "raises", &endpoints.raises).await?;

    let active_users: Result<ActiveUsers> =
        fetch(client, "active-users", &endpoints.active_users).await;
    let active_users = match active_users {
        Ok(users) => users,
        Err(e) => {
            tracing::warn!(error = %e, "Active users unavailable, continuing without them");
            ActiveUsers::default()
        }
    };

    let mut dimensions = Vec::with_capacity(DimensionKind::ALL.len());
    for kind in DimensionKind::ALL {
        let overview: DimensionOverview =
            fetch(client, kind.adapter_type(), &endpoints.dimension(kind)).await?;
        dimensions.push((kind, overview));
    }

    let emissions = fetch(client, "emissions", &endpoints.emissions).await?;
    let bridges = fetch(client, "bridges", &endpoints.bridges).await?;
    let chain_assets = fetch(client, "chain-assets", &endpoints.chain_assets).await?;
    let chains = fetch(client, "chains", &endpoints.chains).await?;

    Ok(UpstreamData {
        listing,
        yields: yields.data,
        expenses,
        treasuries,
        liquidity,
        hacks,
        nft_marketplaces,
        raises,
        active_users,
        dimensions,
        emissions,
        bridges,
        chain_assets,
        chains,
    })
}

/// Build a fresh snapshot from upstream and write it to `output.dir`.
pub async fn run(config: &AppConfig) -> Result<MetadataSnapshot> {
    let client = UpstreamClient::new(&config.fetch)?;
    let endpoints = Endpoints::new(&config.api);

    tracing::info!(
        server = %config.api.server_url,
        over_cache = client.is_cached(),
        "Building metadata"
    );

    let data = fetch_upstream(&client, &endpoints).await?;
    let snapshot = build_metadata(&data);
    write_snapshot(Path::new(&config.output.dir), &snapshot).await?;

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, FetchConfig, OutputConfig, RefreshConfig};
    use crate::writer::{CHAINS_FILE, PROTOCOLS_FILE};
    use httpmock::prelude::*;
    use serde_json::{json, Value};

    fn feeds() -> Vec<(&'static str, Value)> {
        let empty_overview = json!({"protocols": [], "allChains": []});
        let mut feeds = vec![
            (
                "/lite/protocols2",
                json!({
                    "chains": ["Ethereum"],
                    "protocols": [{"defillamaId": "1", "name": "Aave", "tvl": 500}],
                    "parentProtocols": []
                }),
            ),
            ("/pools", json!({"status": "success", "data": []})),
            ("/expenses", json!([])),
            ("/treasuries", json!([])),
            ("/liquidity.json", json!([])),
            ("/hacks", json!([{"defillamaId": null, "name": "X"}])),
            ("/exchangeStats", json!([{"exchangeName": "OpenSea"}])),
            ("/raises", json!({"raises": []})),
            ("/activeUsers", json!({})),
            ("/emissionsProtocolsList", json!([])),
            ("/bridges", json!({"bridges": [], "chains": []})),
            ("/chain-assets/chains", json!({})),
            ("/chains", json!([])),
        ];
        for adapter in [
            "/overview/fees",
            "/overview/dexs",
            "/overview/derivatives",
            "/overview/aggregators",
            "/overview/options",
            "/overview/aggregator-derivatives",
            "/overview/bridge-aggregators",
        ] {
            feeds.push((adapter, empty_overview.clone()));
        }
        feeds
    }

    async fn mock_feeds(server: &MockServer, except: &[&str]) {
        for (path, body) in feeds() {
            if except.contains(&path) {
                continue;
            }
            server
                .mock_async(|when, then| {
                    when.method(GET).path(path);
                    then.status(200).json_body(body);
                })
                .await;
        }
    }

    fn config_for(server: &MockServer, out: &Path) -> AppConfig {
        let base = server.base_url();
        AppConfig {
            api: ApiConfig {
                server_url: base.clone(),
                datasets_url: base.clone(),
                yields_url: base.clone(),
                bridges_url: base.clone(),
                nft_url: base,
            },
            fetch: FetchConfig::default(),
            output: OutputConfig {
                dir: out.to_string_lossy().into_owned(),
            },
            refresh: RefreshConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_run_writes_expected_snapshot() {
        let server = MockServer::start_async().await;
        mock_feeds(&server, &[]).await;
        let dir = tempfile::tempdir().unwrap();

        let snapshot = run(&config_for(&server, dir.path())).await.unwrap();
        assert_eq!(snapshot.protocols.len(), 1);

        let chains: Value =
            serde_json::from_slice(&std::fs::read(dir.path().join(CHAINS_FILE)).unwrap()).unwrap();
        assert_eq!(chains, json!({"Ethereum": {}}));

        let protocols: Value =
            serde_json::from_slice(&std::fs::read(dir.path().join(PROTOCOLS_FILE)).unwrap())
                .unwrap();
        assert_eq!(protocols, json!({"1": {"name": "aave", "tvl": true}}));
    }

    #[tokio::test]
    async fn test_active_users_failure_is_tolerated() {
        let server = MockServer::start_async().await;
        mock_feeds(&server, &["/activeUsers"]).await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/activeUsers");
                then.status(500);
            })
            .await;
        let dir = tempfile::tempdir().unwrap();

        let snapshot = run(&config_for(&server, dir.path())).await.unwrap();
        assert!(!snapshot.protocol("1").unwrap().active_users);
    }

    #[tokio::test]
    async fn test_failed_feed_aborts_before_writing() {
        let server = MockServer::start_async().await;
        mock_feeds(&server, &["/hacks"]).await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/hacks");
                then.status(503);
            })
            .await;
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("metadata");

        let result = run(&config_for(&server, &out)).await;
        assert!(result.is_err());
        assert!(!out.join(PROTOCOLS_FILE).exists());
    }

    #[tokio::test]
    async fn test_identical_upstream_gives_identical_files() {
        let server = MockServer::start_async().await;
        mock_feeds(&server, &[]).await;
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();

        run(&config_for(&server, first.path())).await.unwrap();
        run(&config_for(&server, second.path())).await.unwrap();

        for file in [PROTOCOLS_FILE, CHAINS_FILE] {
            assert_eq!(
                std::fs::read(first.path().join(file)).unwrap(),
                std::fs::read(second.path().join(file)).unwrap()
            );
        }
    }
}
