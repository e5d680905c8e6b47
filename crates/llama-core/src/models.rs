//! Capability metadata for protocols and chains
//!
//! Every boolean here is a presence flag: it is written to JSON only when
//! `true`, and a consumer treats a missing key as "no data in that category".
//! Flags are only ever switched on during a build.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;

fn is_false(value: &bool) -> bool {
    !*value
}

// =============================================================================
// Protocols
// =============================================================================

/// Capability record for one protocol, keyed by `defillamaId` in the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolMetadata {
    /// Slugified display name. Absent for ids that only show up in
    /// secondary datasets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub tvl: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub yields: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub governance: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub expenses: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub treasury: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub liquidity: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hacks: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub nfts: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub raises: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub active_users: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub fees: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub revenue: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub dexs: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub perps: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub aggregator: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub options: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub perps_aggregators: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub bridge_aggregators: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub emissions: bool,
}

/// A single capability that can be switched on for a protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolFlag {
    Tvl,
    Yields,
    Governance,
    Expenses,
    Treasury,
    Liquidity,
    Hacks,
    Nfts,
    Raises,
    ActiveUsers,
    Fees,
    Revenue,
    Dexs,
    Perps,
    Aggregator,
    Options,
    PerpsAggregators,
    BridgeAggregators,
    Emissions,
}

impl ProtocolMetadata {
    /// Switch a flag on. Flags are never cleared within a build.
    pub fn set(&mut self, flag: ProtocolFlag) {
        let slot = match flag {
            ProtocolFlag::Tvl => &mut self.tvl,
            ProtocolFlag::Yields => &mut self.yields,
            ProtocolFlag::Governance => &mut self.governance,
            ProtocolFlag::Expenses => &mut self.expenses,
            ProtocolFlag::Treasury => &mut self.treasury,
            ProtocolFlag::Liquidity => &mut self.liquidity,
            ProtocolFlag::Hacks => &mut self.hacks,
            ProtocolFlag::Nfts => &mut self.nfts,
            ProtocolFlag::Raises => &mut self.raises,
            ProtocolFlag::ActiveUsers => &mut self.active_users,
            ProtocolFlag::Fees => &mut self.fees,
            ProtocolFlag::Revenue => &mut self.revenue,
            ProtocolFlag::Dexs => &mut self.dexs,
            ProtocolFlag::Perps => &mut self.perps,
            ProtocolFlag::Aggregator => &mut self.aggregator,
            ProtocolFlag::Options => &mut self.options,
            ProtocolFlag::PerpsAggregators => &mut self.perps_aggregators,
            ProtocolFlag::BridgeAggregators => &mut self.bridge_aggregators,
            ProtocolFlag::Emissions => &mut self.emissions,
        };
        *slot = true;
    }

    pub fn has(&self, flag: ProtocolFlag) -> bool {
        match flag {
            ProtocolFlag::Tvl => self.tvl,
            ProtocolFlag::Yields => self.yields,
            ProtocolFlag::Governance => self.governance,
            ProtocolFlag::Expenses => self.expenses,
            ProtocolFlag::Treasury => self.treasury,
            ProtocolFlag::Liquidity => self.liquidity,
            ProtocolFlag::Hacks => self.hacks,
            ProtocolFlag::Nfts => self.nfts,
            ProtocolFlag::Raises => self.raises,
            ProtocolFlag::ActiveUsers => self.active_users,
            ProtocolFlag::Fees => self.fees,
            ProtocolFlag::Revenue => self.revenue,
            ProtocolFlag::Dexs => self.dexs,
            ProtocolFlag::Perps => self.perps,
            ProtocolFlag::Aggregator => self.aggregator,
            ProtocolFlag::Options => self.options,
            ProtocolFlag::PerpsAggregators => self.perps_aggregators,
            ProtocolFlag::BridgeAggregators => self.bridge_aggregators,
            ProtocolFlag::Emissions => self.emissions,
        }
    }
}

// =============================================================================
// Chains
// =============================================================================

/// Capability record for one chain, keyed by the chain's display name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainMetadata {
    #[serde(default, skip_serializing_if = "is_false")]
    pub active_users: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub inflows: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub chain_assets: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub fees: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub dexs: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub derivatives: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub aggregators: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub options: bool,
    #[serde(
        rename = "aggregator-derivatives",
        default,
        skip_serializing_if = "is_false"
    )]
    pub aggregator_derivatives: bool,
    #[serde(
        rename = "bridge-aggregators",
        default,
        skip_serializing_if = "is_false"
    )]
    pub bridge_aggregators: bool,
    /// CoinGecko id of the chain's native token
    #[serde(rename = "gecko_id", default, skip_serializing_if = "Option::is_none")]
    pub gecko_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_symbol: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainFlag {
    ActiveUsers,
    Inflows,
    ChainAssets,
    Fees,
    Dexs,
    Derivatives,
    Aggregators,
    Options,
    AggregatorDerivatives,
    BridgeAggregators,
}

impl ChainMetadata {
    pub fn set(&mut self, flag: ChainFlag) {
        let slot = match flag {
            ChainFlag::ActiveUsers => &mut self.active_users,
            ChainFlag::Inflows => &mut self.inflows,
            ChainFlag::ChainAssets => &mut self.chain_assets,
            ChainFlag::Fees => &mut self.fees,
            ChainFlag::Dexs => &mut self.dexs,
            ChainFlag::Derivatives => &mut self.derivatives,
            ChainFlag::Aggregators => &mut self.aggregators,
            ChainFlag::Options => &mut self.options,
            ChainFlag::AggregatorDerivatives => &mut self.aggregator_derivatives,
            ChainFlag::BridgeAggregators => &mut self.bridge_aggregators,
        };
        *slot = true;
    }
}

// =============================================================================
// Snapshot
// =============================================================================

pub type ProtocolMap = BTreeMap<String, ProtocolMetadata>;
pub type ChainMap = BTreeMap<String, ChainMetadata>;

/// The two maps produced by one build. Ordered maps keep the serialized
/// output byte-stable for identical inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataSnapshot {
    pub protocols: ProtocolMap,
    pub chains: ChainMap,
}

impl MetadataSnapshot {
    pub fn protocol(&self, id: &str) -> Option<&ProtocolMetadata> {
        self.protocols.get(id)
    }

    pub fn chain(&self, name: &str) -> Option<&ChainMetadata> {
        self.chains.get(name)
    }

    /// Rebuild a snapshot from the two serialized maps.
    pub fn from_json(protocols: &[u8], chains: &[u8]) -> CoreResult<Self> {
        Ok(Self {
            protocols: serde_json::from_slice(protocols)?,
            chains: serde_json::from_slice(chains)?,
        })
    }

    pub fn protocols_json(&self) -> CoreResult<Vec<u8>> {
        to_pretty_json(&self.protocols)
    }

    pub fn chains_json(&self) -> CoreResult<Vec<u8>> {
        to_pretty_json(&self.chains)
    }
}

/// Serialize with 4-space indentation.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> CoreResult<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}
