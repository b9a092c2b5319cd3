use serde::{Deserialize, Serialize};

/// Point-in-time read of one DEX liquidity pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolSnapshot {
    pub name: String,
    pub address: String,
    pub network: String,
    pub dex: String,
    pub base_token: String,
    pub quote_token: String,
    pub price_usd: Option<f64>,
    pub liquidity: Option<f64>,
    pub volume_24h: Option<f64>,
    pub price_change_24h: Option<f64>,
}

impl PoolSnapshot {
    /// Base/quote pair contains both tokens, in either order.
    /// Containment is case-insensitive, so "ETH" matches a "WETH" leg.
    pub fn matches_pair(&self, token_a: &str, token_b: &str) -> bool {
        let base = self.base_token.to_lowercase();
        let quote = self.quote_token.to_lowercase();
        let a = token_a.to_lowercase();
        let b = token_b.to_lowercase();

        (base.contains(&a) && quote.contains(&b)) || (base.contains(&b) && quote.contains(&a))
    }
}
