use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::MarketDataError;
use crate::models::pool::PoolSnapshot;
use crate::services::upstream::{RetryPolicy, send_json};

const SERVICE: &str = "GeckoTerminal";

/// Pools returned per lookup.
pub const MAX_POOLS: usize = 10;

/// Pseudo-network meaning "across every network".
pub const ALL_NETWORKS: &str = "all";

#[derive(Clone)]
pub struct GeckoTerminalService {
    client: Client,
    base_url: String,
}

// JSON:API envelope returned by GeckoTerminal
#[derive(Debug, Deserialize)]
struct PoolsResponse {
    #[serde(default)]
    data: Vec<PoolResource>,
    #[serde(default)]
    included: Vec<IncludedResource>,
}

#[derive(Debug, Deserialize)]
struct PoolResource {
    id: String,
    attributes: PoolAttributes,
    #[serde(default)]
    relationships: PoolRelationships,
}

#[derive(Debug, Deserialize)]
struct PoolAttributes {
    #[serde(default)]
    name: String,
    #[serde(default)]
    address: String,
    #[serde(default)]
    base_token_price_usd: Value,
    #[serde(default)]
    reserve_in_usd: Value,
    #[serde(default)]
    volume_usd: Value,
    #[serde(default)]
    price_change_percentage: Value,
}

#[derive(Debug, Default, Deserialize)]
struct PoolRelationships {
    base_token: Option<Relationship>,
    quote_token: Option<Relationship>,
    dex: Option<Relationship>,
    network: Option<Relationship>,
}

#[derive(Debug, Deserialize)]
struct Relationship {
    data: Option<ResourceId>,
}

#[derive(Debug, Deserialize)]
struct ResourceId {
    id: String,
}

#[derive(Debug, Deserialize)]
struct IncludedResource {
    id: String,
    #[serde(default)]
    attributes: IncludedAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct IncludedAttributes {
    symbol: Option<String>,
    name: Option<String>,
}

fn relationship_id(relationship: &Option<Relationship>) -> Option<&str> {
    relationship
        .as_ref()
        .and_then(|r| r.data.as_ref())
        .map(|d| d.id.as_str())
}

/// GeckoTerminal encodes decimals as strings; accept numbers too.
fn decimal(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn h24(value: &Value) -> Option<f64> {
    value.get("h24").and_then(decimal)
}

/// "WETH / USDC 0.05%" -> ("WETH", "USDC")
fn tokens_from_name(name: &str) -> (String, String) {
    let mut parts = name.splitn(2, '/');
    let base = parts.next().unwrap_or_default().trim();
    let quote = parts
        .next()
        .and_then(|q| q.split_whitespace().next())
        .unwrap_or_default();
    (base.to_string(), quote.to_string())
}

impl PoolsResponse {
    fn into_snapshots(self, requested_network: &str) -> Vec<PoolSnapshot> {
        // Index tokens and dexes from the `included` sideload by id
        let included: HashMap<&str, &IncludedAttributes> = self
            .included
            .iter()
            .map(|r| (r.id.as_str(), &r.attributes))
            .collect();

        let symbol_of = |rel: &Option<Relationship>| {
            relationship_id(rel)
                .and_then(|id| included.get(id))
                .and_then(|attrs| attrs.symbol.clone())
        };

        self.data
            .iter()
            .take(MAX_POOLS)
            .map(|pool| {
                let rel = &pool.relationships;
                // Pool name is the fallback when token relationships are missing
                let (name_base, name_quote) = tokens_from_name(&pool.attributes.name);

                // Resolve dex display name
                let dex_id = relationship_id(&rel.dex).unwrap_or("unknown");
                let dex = included
                    .get(dex_id)
                    .and_then(|attrs| attrs.name.clone())
                    .unwrap_or_else(|| dex_id.to_string());

                // Pool ids are "<network>_<address>"; network ids may contain '_'.
                let network = relationship_id(&rel.network)
                    .map(str::to_string)
                    .or_else(|| {
                        (requested_network != ALL_NETWORKS).then(|| requested_network.to_string())
                    })
                    .or_else(|| pool.id.rsplit_once('_').map(|(net, _)| net.to_string()))
                    .unwrap_or_else(|| requested_network.to_string());

                PoolSnapshot {
                    name: pool.attributes.name.clone(),
                    address: pool.attributes.address.clone(),
                    network,
                    dex,
                    base_token: symbol_of(&rel.base_token).unwrap_or(name_base),
                    quote_token: symbol_of(&rel.quote_token).unwrap_or(name_quote),
                    price_usd: decimal(&pool.attributes.base_token_price_usd),
                    liquidity: decimal(&pool.attributes.reserve_in_usd),
                    volume_24h: h24(&pool.attributes.volume_usd),
                    price_change_24h: h24(&pool.attributes.price_change_percentage),
                }
            })
            .collect()
    }
}

impl GeckoTerminalService {
    pub fn new(client: Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// One page of top pools for `network` (or trending pools for `all`),
    /// capped at `MAX_POOLS` entries.
    pub async fn get_pools(
        &self,
        network: &str,
        page: u32,
    ) -> Result<Vec<PoolSnapshot>, MarketDataError> {
        let network = network.trim().to_lowercase();
        // "all" maps to the cross-network trending list
        let url = if network == ALL_NETWORKS {
            format!("{}/networks/trending_pools", self.base_url)
        } else {
            format!("{}/networks/{}/pools", self.base_url, network)
        };

        tracing::info!("Fetching pools for network '{}' (page {}) from GeckoTerminal", network, page);

        let page = page.max(1).to_string();
        let request = self
            .client
            .get(url)
            .header("accept", "application/json")
            .query(&[
                ("page", page.as_str()),
                ("include", "base_token,quote_token,dex"),
            ]);

        // Call GeckoTerminal
        let response: PoolsResponse = send_json(SERVICE, request, &RetryPolicy::NONE).await?;
        let pools = response.into_snapshots(&network);

        tracing::debug!("Fetched {} pools for '{}'", pools.len(), network);

        Ok(pools)
    }

    /// Pools on the first page of `network` trading `token_a` against `token_b`.
    pub async fn search_pool(
        &self,
        token_a: &str,
        token_b: &str,
        network: &str,
    ) -> Result<Vec<PoolSnapshot>, MarketDataError> {
        let pools = self.get_pools(network, 1).await?;
        filter_pools_by_pair(pools, token_a, token_b, network)
    }
}

/// Keep pools whose base/quote pair matches `{token_a, token_b}` in either order.
pub fn filter_pools_by_pair(
    pools: Vec<PoolSnapshot>,
    token_a: &str,
    token_b: &str,
    network: &str,
) -> Result<Vec<PoolSnapshot>, MarketDataError> {
    let matching: Vec<PoolSnapshot> = pools
        .into_iter()
        .filter(|pool| pool.matches_pair(token_a, token_b))
        .collect();

    if matching.is_empty() {
        return Err(MarketDataError::NoPoolsFound {
            token_a: token_a.to_string(),
            token_b: token_b.to_string(),
            network: network.to_string(),
        });
    }

    Ok(matching)
}
