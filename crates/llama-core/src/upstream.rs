//! Wire types for the upstream DefiLlama datasets
//!
//! Only the fields the metadata build reads are modelled; everything else in
//! the responses is ignored. Ids arrive as strings in most feeds and as
//! numbers in a few, so every id goes through [`lenient_id`].

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::models::{ChainFlag, ProtocolFlag};

/// Accept a string or numeric id; treat null, empty strings and anything
/// else as missing.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

// =============================================================================
// Protocols listing
// =============================================================================

/// `GET /lite/protocols2`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProtocolsListing {
    #[serde(default)]
    pub chains: Vec<String>,
    #[serde(default)]
    pub protocols: Vec<ListedProtocol>,
    #[serde(rename = "parentProtocols", default)]
    pub parent_protocols: Vec<ParentProtocol>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListedProtocol {
    #[serde(rename = "defillamaId", default, deserialize_with = "lenient_id")]
    pub defillama_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tvl: Option<f64>,
    #[serde(rename = "parentProtocol", default, deserialize_with = "lenient_id")]
    pub parent_protocol: Option<String>,
    #[serde(rename = "governanceID", default)]
    pub governance_id: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParentProtocol {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "governanceID", default)]
    pub governance_id: Option<Value>,
}

// =============================================================================
// Per-category feeds
// =============================================================================

/// `GET yields/pools`, only the `data` array is used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct YieldPools {
    #[serde(default)]
    pub data: Vec<YieldPool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct YieldPool {
    #[serde(default)]
    pub project: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseRecord {
    #[serde(rename = "protocolId", default, deserialize_with = "lenient_id")]
    pub protocol_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TreasuryRecord {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
}

impl TreasuryRecord {
    /// Treasury ids are the protocol id with a `-treasury` suffix.
    pub fn protocol_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .and_then(|id| id.split("-treasury").next())
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LiquidityRecord {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HackRecord {
    #[serde(rename = "defillamaId", default, deserialize_with = "lenient_id")]
    pub defillama_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NftMarketplaceStats {
    #[serde(rename = "exchangeName", default)]
    pub exchange_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RaisesResponse {
    #[serde(default)]
    pub raises: Vec<Raise>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Raise {
    #[serde(rename = "defillamaId", default, deserialize_with = "lenient_id")]
    pub defillama_id: Option<String>,
}

/// Keyed by protocol id, or `chain#<slug>` for chains.
pub type ActiveUsers = BTreeMap<String, Value>;

/// Slugs of protocols with an emissions schedule.
pub type EmissionsList = Vec<String>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BridgesResponse {
    #[serde(default)]
    pub chains: Vec<BridgeChain>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BridgeChain {
    #[serde(default)]
    pub name: String,
}

/// Keyed by chain display name.
pub type ChainAssets = BTreeMap<String, Value>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChainInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub gecko_id: Option<String>,
    #[serde(rename = "tokenSymbol", default)]
    pub token_symbol: Option<String>,
}

// =============================================================================
// Dimension overviews
// =============================================================================

/// `GET /overview/{adapter}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DimensionOverview {
    #[serde(default)]
    pub protocols: Vec<DimensionProtocol>,
    #[serde(rename = "allChains", default)]
    pub all_chains: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DimensionProtocol {
    #[serde(rename = "defillamaId", default, deserialize_with = "lenient_id")]
    pub defillama_id: Option<String>,
    #[serde(rename = "parentProtocol", default, deserialize_with = "lenient_id")]
    pub parent_protocol: Option<String>,
}

/// One dimension overview feed and the flags it contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DimensionKind {
    Fees,
    Revenue,
    Dexs,
    Derivatives,
    Aggregators,
    Options,
    AggregatorDerivatives,
    BridgeAggregators,
}

impl DimensionKind {
    pub const ALL: [DimensionKind; 8] = [
        DimensionKind::Fees,
        DimensionKind::Revenue,
        DimensionKind::Dexs,
        DimensionKind::Derivatives,
        DimensionKind::Aggregators,
        DimensionKind::Options,
        DimensionKind::AggregatorDerivatives,
        DimensionKind::BridgeAggregators,
    ];

    /// Path segment under `/overview`.
    pub fn adapter_type(self) -> &'static str {
        match self {
            DimensionKind::Fees | DimensionKind::Revenue => "fees",
            DimensionKind::Dexs => "dexs",
            DimensionKind::Derivatives => "derivatives",
            DimensionKind::Aggregators => "aggregators",
            DimensionKind::Options => "options",
            DimensionKind::AggregatorDerivatives => "aggregator-derivatives",
            DimensionKind::BridgeAggregators => "bridge-aggregators",
        }
    }

    /// Extra `dataType` query value, if the feed is a variant of another.
    pub fn data_type(self) -> Option<&'static str> {
        match self {
            DimensionKind::Revenue => Some("dailyRevenue"),
            _ => None,
        }
    }

    pub fn protocol_flag(self) -> ProtocolFlag {
        match self {
            DimensionKind::Fees => ProtocolFlag::Fees,
            DimensionKind::Revenue => ProtocolFlag::Revenue,
            DimensionKind::Dexs => ProtocolFlag::Dexs,
            DimensionKind::Derivatives => ProtocolFlag::Perps,
            DimensionKind::Aggregators => ProtocolFlag::Aggregator,
            DimensionKind::Options => ProtocolFlag::Options,
            DimensionKind::AggregatorDerivatives => ProtocolFlag::PerpsAggregators,
            DimensionKind::BridgeAggregators => ProtocolFlag::BridgeAggregators,
        }
    }

    /// Revenue is a view over the fees feed and carries no chain flag.
    pub fn chain_flag(self) -> Option<ChainFlag> {
        match self {
            DimensionKind::Fees => Some(ChainFlag::Fees),
            DimensionKind::Revenue => None,
            DimensionKind::Dexs => Some(ChainFlag::Dexs),
            DimensionKind::Derivatives => Some(ChainFlag::Derivatives),
            DimensionKind::Aggregators => Some(ChainFlag::Aggregators),
            DimensionKind::Options => Some(ChainFlag::Options),
            DimensionKind::AggregatorDerivatives => Some(ChainFlag::AggregatorDerivatives),
            DimensionKind::BridgeAggregators => Some(ChainFlag::BridgeAggregators),
        }
    }
}

// =============================================================================
// Full upstream input
// =============================================================================

/// Every dataset one metadata build consumes.
#[derive(Debug, Clone, Default)]
pub struct UpstreamData {
    pub listing: ProtocolsListing,
    pub yields: Vec<YieldPool>,
    pub expenses: Vec<ExpenseRecord>,
    pub treasuries: Vec<TreasuryRecord>,
    pub liquidity: Vec<LiquidityRecord>,
    pub hacks: Vec<HackRecord>,
    pub nft_marketplaces: Vec<NftMarketplaceStats>,
    pub raises: RaisesResponse,
    pub active_users: ActiveUsers,
    /// In fetch order; see [`DimensionKind::ALL`].
    pub dimensions: Vec<(DimensionKind, DimensionOverview)>,
    pub emissions: EmissionsList,
    pub bridges: BridgesResponse,
    pub chain_assets: ChainAssets,
    pub chains: Vec<ChainInfo>,
}
