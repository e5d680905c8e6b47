//! Upstream endpoint table
//!
//! Every dataset the build reads, resolved against the configured base URLs.

use llama_core::DimensionKind;

use crate::config::ApiConfig;

const DIMENSION_QUERY: &str = "excludeTotalDataChartBreakdown=true&excludeTotalDataChart=true";

#[derive(Debug, Clone)]
pub struct Endpoints {
    pub protocols: String,
    pub yield_pools: String,
    pub expenses: String,
    pub treasuries: String,
    pub liquidity: String,
    pub hacks: String,
    pub nft_marketplaces: String,
    pub raises: String,
    pub active_users: String,
    pub emissions: String,
    pub bridges: String,
    pub chain_assets: String,
    pub chains: String,
    overview_base: String,
}

impl Endpoints {
    pub fn new(api: &ApiConfig) -> Self {
        let server = api.server_url.trim_end_matches('/');
        let datasets = api.datasets_url.trim_end_matches('/');
        let yields = api.yields_url.trim_end_matches('/');
        let bridges = api.bridges_url.trim_end_matches('/');
        let nft = api.nft_url.trim_end_matches('/');

        Self {
            protocols: format!("{}/lite/protocols2?b=2", server),
            yield_pools: format!("{}/pools", yields),
            expenses: format!("{}/expenses", server),
            treasuries: format!("{}/treasuries", server),
            liquidity: format!("{}/liquidity.json", datasets),
            hacks: format!("{}/hacks", server),
            nft_marketplaces: format!("{}/exchangeStats", nft),
            raises: format!("{}/raises", server),
            active_users: format!("{}/activeUsers", server),
            emissions: format!("{}/emissionsProtocolsList", datasets),
            bridges: format!("{}/bridges?includeChains=true", bridges),
            chain_assets: format!("{}/chain-assets/chains", server),
            chains: format!("{}/chains", server),
            overview_base: format!("{}/overview", server),
        }
    }

    /// Overview URL for one dimension, without the chart payloads.
    pub fn dimension(&self, kind: DimensionKind) -> String {
        let mut url = format!(
            "{}/{}?{}",
            self.overview_base,
            kind.adapter_type(),
            DIMENSION_QUERY
        );
        if let Some(data_type) = kind.data_type() {
            url.push_str("&dataType=");
            url.push_str(data_type);
        }
        url
    }
}
