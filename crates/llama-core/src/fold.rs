//! Flag-folding reducer
//!
//! [`MetadataBuilder`] owns both accumulator maps for the duration of one
//! build. Each `fold_*` step walks one upstream dataset and switches flags on
//! for the ids (or chain names) it mentions. Flags are OR-accumulated: a later
//! dataset can add flags but never clears one, so a protocol that disappears
//! from a feed only loses its flag when the next build starts from an empty
//! builder.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::identity::NameIndex;
use crate::models::{
    ChainFlag, ChainMap, ChainMetadata, MetadataSnapshot, ProtocolFlag, ProtocolMap,
    ProtocolMetadata,
};
use crate::slug::slug;
use crate::upstream::*;

#[derive(Debug, Default)]
pub struct MetadataBuilder {
    protocols: ProtocolMap,
    chains: ChainMap,
    /// slug -> chain key, first key wins
    chain_slugs: HashMap<String, String>,
    names: NameIndex,
    skipped: usize,
}

impl MetadataBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> &NameIndex {
        &self.names
    }

    /// Records dropped because they carried no usable id.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn finish(self) -> MetadataSnapshot {
        MetadataSnapshot {
            protocols: self.protocols,
            chains: self.chains,
        }
    }

    // -------------------------------------------------------------------------
    // Accumulator access
    // -------------------------------------------------------------------------

    fn protocol(&mut self, id: &str) -> &mut ProtocolMetadata {
        self.protocols.entry(id.to_string()).or_default()
    }

    fn flag_protocol(&mut self, id: &str, flag: ProtocolFlag) {
        self.protocol(id).set(flag);
    }

    fn flag_protocol_or_skip(&mut self, id: Option<&str>, flag: ProtocolFlag) {
        match id {
            Some(id) => self.flag_protocol(id, flag),
            None => self.skipped += 1,
        }
    }

    fn insert_chain(&mut self, name: &str) -> &mut ChainMetadata {
        let key = self
            .chain_slugs
            .entry(slug(name))
            .or_insert_with(|| name.to_string())
            .clone();
        self.chains.entry(key).or_default()
    }

    fn listed_chain(&mut self, name: &str) -> Option<&mut ChainMetadata> {
        let key = self.chain_slugs.get(&slug(name))?;
        self.chains.get_mut(key)
    }

    /// Flag a chain, creating its entry if the listing did not have it.
    fn flag_chain(&mut self, name: &str, flag: ChainFlag) {
        self.insert_chain(name).set(flag);
    }

    /// Flag a chain only if it is already present.
    fn flag_listed_chain(&mut self, name: &str, flag: ChainFlag) -> bool {
        match self.listed_chain(name) {
            Some(chain) => {
                chain.set(flag);
                true
            }
            None => false,
        }
    }

    // -------------------------------------------------------------------------
    // Folds, in build order
    // -------------------------------------------------------------------------

    /// Seed chains and protocols from the main listing and build the name
    /// index. TVL of a child protocol propagates to its parent.
    pub fn fold_listing(&mut self, listing: &ProtocolsListing, yields: &[YieldPool]) {
        for chain in &listing.chains {
            self.insert_chain(chain);
        }

        let pool_projects: HashSet<&str> =
            yields.iter().filter_map(|p| p.project.as_deref()).collect();
        let mut children: HashMap<&str, Vec<String>> = HashMap::new();

        for protocol in &listing.protocols {
            let Some(id) = protocol.defillama_id.as_deref() else {
                tracing::debug!(name = %protocol.name, "Listed protocol without defillamaId");
                self.skipped += 1;
                continue;
            };

            self.names.insert(id, &protocol.name);
            let name = slug(&protocol.name);
            let has_tvl = protocol.tvl.is_some();

            let entry = self.protocol(id);
            if has_tvl {
                entry.set(ProtocolFlag::Tvl);
            }
            if pool_projects.contains(name.as_str()) {
                entry.set(ProtocolFlag::Yields);
            }
            if protocol.governance_id.is_some() {
                entry.set(ProtocolFlag::Governance);
            }
            entry.name = Some(name.clone());

            if let Some(parent) = protocol.parent_protocol.as_deref() {
                children.entry(parent).or_default().push(name);
                if has_tvl {
                    self.flag_protocol(parent, ProtocolFlag::Tvl);
                }
            }
        }

        for parent in &listing.parent_protocols {
            let Some(id) = parent.id.as_deref() else {
                tracing::debug!(name = %parent.name, "Parent protocol without id");
                self.skipped += 1;
                continue;
            };

            self.names.insert(id, &parent.name);
            let name = slug(&parent.name);
            let has_yields = pool_projects.contains(name.as_str())
                || children.get(id).is_some_and(|kids| {
                    kids.iter().any(|kid| pool_projects.contains(kid.as_str()))
                });

            let entry = self.protocol(id);
            if has_yields {
                entry.set(ProtocolFlag::Yields);
            }
            if parent.governance_id.is_some() {
                entry.set(ProtocolFlag::Governance);
            }
            entry.name.get_or_insert(name);
        }
    }

    pub fn fold_expenses(&mut self, records: &[ExpenseRecord]) {
        for record in records {
            self.flag_protocol_or_skip(record.protocol_id.as_deref(), ProtocolFlag::Expenses);
        }
    }

    pub fn fold_treasuries(&mut self, records: &[TreasuryRecord]) {
        for record in records {
            self.flag_protocol_or_skip(record.protocol_id(), ProtocolFlag::Treasury);
        }
    }

    pub fn fold_liquidity(&mut self, records: &[LiquidityRecord]) {
        for record in records {
            self.flag_protocol_or_skip(record.id.as_deref(), ProtocolFlag::Liquidity);
        }
    }

    /// Hacks on entities that are not tracked protocols have no id and are
    /// skipped.
    pub fn fold_hacks(&mut self, records: &[HackRecord]) {
        for record in records {
            if record.defillama_id.is_none() {
                tracing::debug!(victim = ?record.name, "Skipping hack without defillamaId");
            }
            self.flag_protocol_or_skip(record.defillama_id.as_deref(), ProtocolFlag::Hacks);
        }
    }

    /// Marketplaces are matched by slug against the name index.
    pub fn fold_nft_marketplaces(&mut self, markets: &[NftMarketplaceStats]) {
        for market in markets {
            let Some(exchange) = market.exchange_name.as_deref() else {
                self.skipped += 1;
                continue;
            };
            match self.names.find_by_slug(&slug(exchange)).map(str::to_string) {
                Some(id) => self.flag_protocol(&id, ProtocolFlag::Nfts),
                None => tracing::debug!(exchange, "No protocol matches NFT marketplace"),
            }
        }
    }

    /// Raises attributed to chains (`chain#...`) are not protocol raises.
    pub fn fold_raises(&mut self, raises: &RaisesResponse) {
        for raise in &raises.raises {
            match raise.defillama_id.as_deref() {
                Some(id) if id.starts_with("chain") => {}
                id => self.flag_protocol_or_skip(id, ProtocolFlag::Raises),
            }
        }
    }

    pub fn fold_active_users(&mut self, users: &ActiveUsers) {
        for (key, value) in users {
            if !has_data(value) {
                continue;
            }
            if let Some(chain) = key.strip_prefix("chain#") {
                if !self.flag_listed_chain(chain, ChainFlag::ActiveUsers) {
                    tracing::debug!(key = %key, "Active users for unlisted chain");
                }
            } else if !key.starts_with("chain") {
                self.flag_protocol(key, ProtocolFlag::ActiveUsers);
            }
        }
    }

    /// Children carry the flag up to their parent; chains in `allChains` get
    /// the dimension's chain flag even if the listing did not have them.
    pub fn fold_dimension(&mut self, kind: DimensionKind, overview: &DimensionOverview) {
        let flag = kind.protocol_flag();
        for protocol in &overview.protocols {
            self.flag_protocol_or_skip(protocol.defillama_id.as_deref(), flag);
            if let Some(parent) = protocol.parent_protocol.as_deref() {
                self.flag_protocol(parent, flag);
            }
        }

        if let Some(chain_flag) = kind.chain_flag() {
            for chain in &overview.all_chains {
                self.flag_chain(chain, chain_flag);
            }
        }
    }

    pub fn fold_emissions(&mut self, emissions: &EmissionsList) {
        let listed: HashSet<&str> = emissions.iter().map(String::as_str).collect();
        let matched: Vec<String> = self
            .names
            .iter()
            .filter(|(_, name)| listed.contains(slug(name).as_str()))
            .map(|(id, _)| id.to_string())
            .collect();

        for id in matched {
            self.flag_protocol(&id, ProtocolFlag::Emissions);
        }
    }

    pub fn fold_bridges(&mut self, bridges: &BridgesResponse) {
        for chain in &bridges.chains {
            self.flag_listed_chain(&chain.name, ChainFlag::Inflows);
        }
    }

    pub fn fold_chain_assets(&mut self, assets: &ChainAssets) {
        for (chain, value) in assets {
            if has_data(value) {
                self.flag_listed_chain(chain, ChainFlag::ChainAssets);
            }
        }
    }

    pub fn fold_chain_listing(&mut self, chains: &[ChainInfo]) {
        for info in chains {
            let Some(gecko_id) = info.gecko_id.as_deref() else {
                continue;
            };
            if let Some(chain) = self.listed_chain(&info.name) {
                chain.gecko_id = Some(gecko_id.to_string());
                chain.token_symbol = info.token_symbol.clone();
            }
        }
    }
}

/// `null`, `{}` and `[]` carry nothing worth flagging.
fn has_data(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

/// Run every fold over a complete set of upstream datasets.
pub fn build_metadata(data: &UpstreamData) -> MetadataSnapshot {
    let mut builder = MetadataBuilder::new();

    builder.fold_listing(&data.listing, &data.yields);

    let collisions = builder.names().slug_collisions();
    if collisions > 0 {
        tracing::warn!(
            collisions,
            "Protocol names share slugs; name-based matches use the first listed protocol"
        );
    }

    builder.fold_expenses(&data.expenses);
    builder.fold_treasuries(&data.treasuries);
    builder.fold_liquidity(&data.liquidity);
    builder.fold_hacks(&data.hacks);
    builder.fold_nft_marketplaces(&data.nft_marketplaces);
    builder.fold_raises(&data.raises);
    builder.fold_active_users(&data.active_users);
    for (kind, overview) in &data.dimensions {
        builder.fold_dimension(*kind, overview);
    }
    builder.fold_emissions(&data.emissions);
    builder.fold_bridges(&data.bridges);
    builder.fold_chain_assets(&data.chain_assets);
    builder.fold_chain_listing(&data.chains);

    tracing::debug!(
        protocols = builder.protocols.len(),
        chains = builder.chains.len(),
        skipped = builder.skipped(),
        "Metadata folded"
    );

    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn upstream(listing: serde_json::Value) -> UpstreamData {
        UpstreamData {
            listing: serde_json::from_value(listing).unwrap(),
            ..Default::default()
        }
    }

    fn aave_listing() -> serde_json::Value {
        json!({
            "chains": ["Ethereum", "Arbitrum One"],
            "protocols": [
                {"defillamaId": "1", "name": "Aave V2", "tvl": 500.0, "parentProtocol": "parent#aave"},
                {"defillamaId": "2", "name": "Aave V3", "tvl": null, "parentProtocol": "parent#aave"},
                {"defillamaId": "3", "name": "Magic Eden", "tvl": null},
                {"defillamaId": "4", "name": "Uniswap", "tvl": 0.0, "governanceID": ["snapshot:uniswap"]}
            ],
            "parentProtocols": [{"id": "parent#aave", "name": "Aave"}]
        })
    }

    #[test]
    fn test_minimal_listing() {
        let data = upstream(json!({
            "chains": ["Ethereum"],
            "protocols": [{"defillamaId": "1", "name": "Aave", "tvl": 500}],
            "parentProtocols": []
        }));

        let snapshot = build_metadata(&data);

        assert_eq!(
            String::from_utf8(snapshot.chains_json().unwrap()).unwrap(),
            "{\n    \"Ethereum\": {}\n}"
        );
        assert_eq!(
            serde_json::to_value(&snapshot.protocols).unwrap(),
            json!({"1": {"name": "aave", "tvl": true}})
        );
    }

    #[test]
    fn test_tvl_propagates_to_parent() {
        let snapshot = build_metadata(&upstream(aave_listing()));

        assert!(snapshot.protocol("1").unwrap().tvl);
        assert!(!snapshot.protocol("2").unwrap().tvl);

        let parent = snapshot.protocol("parent#aave").unwrap();
        assert!(parent.tvl);
        assert_eq!(parent.name.as_deref(), Some("aave"));

        // zero is a reported value, not a missing one
        let uniswap = snapshot.protocol("4").unwrap();
        assert!(uniswap.tvl);
        assert!(uniswap.governance);
    }

    #[test]
    fn test_every_listed_chain_has_entry() {
        let snapshot = build_metadata(&upstream(aave_listing()));
        assert!(snapshot.chain("Ethereum").is_some());
        assert!(snapshot.chain("Arbitrum One").is_some());
        assert_eq!(snapshot.chains.len(), 2);
    }

    #[test]
    fn test_yields_match_child_slug_for_parent() {
        let mut data = upstream(aave_listing());
        data.yields = serde_json::from_value(json!([{"project": "aave-v3"}])).unwrap();

        let snapshot = build_metadata(&data);
        assert!(snapshot.protocol("2").unwrap().yields);
        assert!(snapshot.protocol("parent#aave").unwrap().yields);
        assert!(!snapshot.protocol("1").unwrap().yields);
    }

    #[test]
    fn test_hack_without_id_is_skipped() {
        let mut data = upstream(aave_listing());
        data.hacks =
            serde_json::from_value(json!([{"defillamaId": null, "name": "X"}, {"defillamaId": 3}]))
                .unwrap();

        let mut builder = MetadataBuilder::new();
        builder.fold_listing(&data.listing, &data.yields);
        builder.fold_hacks(&data.hacks);
        assert_eq!(builder.skipped(), 1);

        let snapshot = builder.finish();
        let hacked: Vec<_> = snapshot
            .protocols
            .iter()
            .filter(|(_, p)| p.hacks)
            .map(|(id, _)| id.as_str())
            .collect();
        assert_eq!(hacked, vec!["3"]);
        assert!(!snapshot.protocols.contains_key("X"));
        assert!(!snapshot.protocols.contains_key("x"));
    }

    #[test]
    fn test_unmatched_nft_marketplace_changes_nothing() {
        let mut data = upstream(aave_listing());
        let before = build_metadata(&data);

        data.nft_marketplaces =
            serde_json::from_value(json!([{"exchangeName": "OpenSea"}])).unwrap();
        let after = build_metadata(&data);

        assert_eq!(before, after);
        assert!(after.protocols.values().all(|p| !p.nfts));
    }

    #[test]
    fn test_nft_marketplace_matched_by_slug() {
        let mut data = upstream(aave_listing());
        data.nft_marketplaces =
            serde_json::from_value(json!([{"exchangeName": "magic eden"}])).unwrap();

        let snapshot = build_metadata(&data);
        assert!(snapshot.protocol("3").unwrap().nfts);
    }

    #[test]
    fn test_secondary_feeds() {
        let mut data = upstream(aave_listing());
        data.expenses = serde_json::from_value(json!([{"protocolId": "4"}])).unwrap();
        data.treasuries = serde_json::from_value(json!([{"id": "parent#aave-treasury"}])).unwrap();
        data.liquidity = serde_json::from_value(json!([{"id": "4"}])).unwrap();
        data.raises = serde_json::from_value(json!({
            "raises": [{"defillamaId": "1"}, {"defillamaId": "chain#ethereum"}, {"defillamaId": null}]
        }))
        .unwrap();
        data.emissions = vec!["uniswap".to_string(), "not-listed".to_string()];

        let snapshot = build_metadata(&data);
        let uniswap = snapshot.protocol("4").unwrap();
        assert!(uniswap.expenses && uniswap.liquidity && uniswap.emissions);
        assert!(snapshot.protocol("parent#aave").unwrap().treasury);
        assert!(snapshot.protocol("1").unwrap().raises);
        assert!(!snapshot.protocols.contains_key("chain#ethereum"));
    }

    #[test]
    fn test_active_users_split_between_chains_and_protocols() {
        let mut data = upstream(aave_listing());
        data.active_users = serde_json::from_value(json!({
            "chain#arbitrum-one": {"users": 10},
            "chain#solana": {"users": 5},
            "1": {"users": 3},
            "2": null
        }))
        .unwrap();

        let snapshot = build_metadata(&data);
        assert!(snapshot.chain("Arbitrum One").unwrap().active_users);
        assert!(snapshot.chain("Solana").is_none());
        assert!(snapshot.protocol("1").unwrap().active_users);
        assert!(!snapshot.protocol("2").unwrap().active_users);
    }

    #[test]
    fn test_dimension_flags_propagate() {
        let mut data = upstream(aave_listing());
        let overview: DimensionOverview = serde_json::from_value(json!({
            "protocols": [{"defillamaId": "2", "parentProtocol": "parent#aave"}],
            "allChains": ["Ethereum", "Base"]
        }))
        .unwrap();
        data.dimensions = vec![
            (DimensionKind::Fees, overview.clone()),
            (DimensionKind::Revenue, overview),
        ];

        let snapshot = build_metadata(&data);
        let parent = snapshot.protocol("parent#aave").unwrap();
        assert!(parent.fees && parent.revenue);
        assert!(snapshot.protocol("2").unwrap().fees);
        assert!(snapshot.chain("Ethereum").unwrap().fees);
        assert!(snapshot.chain("Base").unwrap().fees);
    }

    #[test]
    fn test_chain_only_feeds_require_listed_chain() {
        let mut data = upstream(aave_listing());
        data.bridges =
            serde_json::from_value(json!({"chains": [{"name": "Ethereum"}, {"name": "Tron"}]}))
                .unwrap();
        data.chain_assets =
            serde_json::from_value(json!({"Arbitrum One": {"total": 1}, "Tron": {}})).unwrap();
        data.chains = serde_json::from_value(json!([
            {"name": "Ethereum", "gecko_id": "ethereum", "tokenSymbol": "ETH"},
            {"name": "Arbitrum One", "gecko_id": null, "tokenSymbol": "ARB"}
        ]))
        .unwrap();

        let snapshot = build_metadata(&data);
        let ethereum = snapshot.chain("Ethereum").unwrap();
        assert!(ethereum.inflows);
        assert_eq!(ethereum.gecko_id.as_deref(), Some("ethereum"));
        assert_eq!(ethereum.token_symbol.as_deref(), Some("ETH"));

        let arbitrum = snapshot.chain("Arbitrum One").unwrap();
        assert!(arbitrum.chain_assets);
        assert!(arbitrum.token_symbol.is_none());
        assert!(snapshot.chain("Tron").is_none());
    }

    #[test]
    fn test_empty_chain_data_sets_no_flag() {
        let mut data = upstream(aave_listing());
        data.chain_assets =
            serde_json::from_value(json!({"Ethereum": {}, "Arbitrum One": []})).unwrap();
        data.active_users = serde_json::from_value(json!({
            "chain#ethereum": {},
            "chain#arbitrum-one": {"users": 10},
            "3": [],
            "4": 0
        }))
        .unwrap();

        let snapshot = build_metadata(&data);
        let ethereum = snapshot.chain("Ethereum").unwrap();
        assert_eq!(ethereum, &ChainMetadata::default());
        assert!(!snapshot.chain("Arbitrum One").unwrap().chain_assets);
        assert!(snapshot.chain("Arbitrum One").unwrap().active_users);
        assert!(!snapshot.protocol("3").unwrap().active_users);
        assert!(snapshot.protocol("4").unwrap().active_users);

        assert_eq!(
            String::from_utf8(snapshot.chains_json().unwrap()).unwrap(),
            "{\n    \"Arbitrum One\": {\n        \"activeUsers\": true\n    },\n    \"Ethereum\": {}\n}"
        );
    }

    #[test]
    fn test_build_is_deterministic() {
        let mut data = upstream(aave_listing());
        data.emissions = vec!["aave".to_string()];
        data.active_users = serde_json::from_value(json!({"4": 1, "1": 2})).unwrap();

        let first = build_metadata(&data);
        let second = build_metadata(&data);
        assert_eq!(first.protocols_json().unwrap(), second.protocols_json().unwrap());
        assert_eq!(first.chains_json().unwrap(), second.chains_json().unwrap());
    }
}
