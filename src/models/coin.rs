use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::services::format_utils::format_percent;

/// Point-in-time read of one asset. Every numeric field may be missing upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinSnapshot {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub image: Option<String>,
    pub price: Option<f64>,
    pub percent_change_24h: Option<f64>,
    pub percent_change_7d: Option<f64>,
    pub percent_change_30d: Option<f64>,
    pub market_cap: Option<f64>,
    pub volume_24h: Option<f64>,
    pub rank: Option<u32>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    // the trending table reads this one in snake_case
    #[serde(rename = "circulating_supply")]
    pub circulating_supply: Option<f64>,
}

/// Simplified coin shape returned by the search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinSummary {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub image: Option<String>,
    pub price: Option<f64>,
    pub percent_change_24h: Option<f64>,
    /// Signed, formatted 24h change ("+1.23%")
    pub change: String,
    pub market_cap: Option<f64>,
    pub rank: Option<u32>,
}

impl From<CoinSnapshot> for CoinSummary {
    fn from(coin: CoinSnapshot) -> Self {
        Self {
            change: format_percent(coin.percent_change_24h),
            id: coin.id,
            name: coin.name,
            symbol: coin.symbol,
            image: coin.image,
            price: coin.price,
            percent_change_24h: coin.percent_change_24h,
            market_cap: coin.market_cap,
            rank: coin.rank,
        }
    }
}

/// A recently listed asset together with its market data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCoinSnapshot {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub activated_at: Option<DateTime<Utc>>,
    pub price: Option<f64>,
    pub market_cap: Option<f64>,
    pub volume_24h: Option<f64>,
    pub percent_change_24h: Option<f64>,
    pub description: Option<String>,
}

/// Query parameters for GET /api/top-cryptos
#[derive(Debug, Clone, Deserialize)]
pub struct TopCryptosQuery {
    pub limit: Option<u32>,
}

impl TopCryptosQuery {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 250;

    pub fn validate(&self) -> Result<u32, String> {
        let limit = self.limit.unwrap_or(Self::DEFAULT_LIMIT);
        if limit < 1 || limit > Self::MAX_LIMIT {
            return Err(format!(
                "limit must be between 1 and {}, got: {}",
                Self::MAX_LIMIT,
                limit
            ));
        }
        Ok(limit)
    }
}

/// Query parameters for GET /api/search-coins
#[derive(Debug, Clone, Deserialize)]
pub struct SearchCoinsQuery {
    pub query: Option<String>,
    pub limit: Option<u32>,
}

impl SearchCoinsQuery {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 50;

    /// Returns the trimmed query and the effective limit.
    pub fn validate(&self) -> Result<(String, u32), String> {
        let query = self
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| "Query parameter is required".to_string())?;

        let limit = self.limit.unwrap_or(Self::DEFAULT_LIMIT);
        if limit < 1 || limit > Self::MAX_LIMIT {
            return Err(format!(
                "limit must be between 1 and {}, got: {}",
                Self::MAX_LIMIT,
                limit
            ));
        }

        Ok((query.to_string(), limit))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinsResponse<T> {
    pub coins: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_cryptos_limit_defaults_to_ten() {
        assert_eq!(TopCryptosQuery { limit: None }.validate(), Ok(10));
        assert_eq!(TopCryptosQuery { limit: Some(50) }.validate(), Ok(50));
        assert!(TopCryptosQuery { limit: Some(0) }.validate().is_err());
        assert!(TopCryptosQuery { limit: Some(251) }.validate().is_err());
    }

    #[test]
    fn test_search_query_required() {
        let blank = SearchCoinsQuery {
            query: Some("   ".to_string()),
            limit: None,
        };
        assert_eq!(blank.validate().unwrap_err(), "Query parameter is required");

        let ok = SearchCoinsQuery {
            query: Some(" pepe ".to_string()),
            limit: Some(3),
        };
        assert_eq!(ok.validate().unwrap(), ("pepe".to_string(), 3));
    }

    #[test]
    fn test_summary_carries_signed_change() {
        let coin = CoinSnapshot {
            id: "bitcoin".to_string(),
            name: "Bitcoin".to_string(),
            symbol: "BTC".to_string(),
            image: None,
            price: Some(65000.0),
            percent_change_24h: Some(2.5),
            percent_change_7d: None,
            percent_change_30d: None,
            market_cap: Some(1.2e12),
            volume_24h: None,
            rank: Some(1),
            high_24h: None,
            low_24h: None,
            circulating_supply: None,
        };
        let summary = CoinSummary::from(coin);
        assert_eq!(summary.change, "+2.50%");
        assert_eq!(summary.rank, Some(1));
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let json = serde_json::to_value(CoinSnapshot {
            id: "ethereum".to_string(),
            name: "Ethereum".to_string(),
            symbol: "ETH".to_string(),
            image: None,
            price: Some(3000.0),
            percent_change_24h: Some(-1.0),
            percent_change_7d: None,
            percent_change_30d: None,
            market_cap: Some(3.6e11),
            volume_24h: Some(1.0e10),
            rank: Some(2),
            high_24h: None,
            low_24h: None,
            circulating_supply: Some(120_000_000.0),
        })
        .unwrap();
        assert_eq!(json["percentChange24h"], -1.0);
        assert_eq!(json["marketCap"], 3.6e11);
        assert_eq!(json["volume24h"], 1.0e10);
        assert!(json["percentChange7d"].is_null());
        assert_eq!(json["circulating_supply"], 120_000_000.0);
        assert!(json.get("circulatingSupply").is_none());
    }
}
