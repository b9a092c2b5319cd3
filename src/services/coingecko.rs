use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::MarketDataError;
use crate::models::coin::CoinSnapshot;
use crate::services::symbols::SymbolTable;
use crate::services::upstream::{RetryPolicy, send_json};

const SERVICE: &str = "CoinGecko";

#[derive(Clone)]
pub struct CoinGeckoService {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    symbols: Arc<SymbolTable>,
}

#[derive(Debug, Default, Deserialize)]
struct UsdValue {
    usd: Option<f64>,
}

fn usd(value: &Option<UsdValue>) -> Option<f64> {
    value.as_ref().and_then(|v| v.usd)
}

#[derive(Debug, Default, Deserialize)]
struct CoinImage {
    large: Option<String>,
    small: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LocalizedText {
    en: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CoinMarketData {
    current_price: Option<UsdValue>,
    market_cap: Option<UsdValue>,
    total_volume: Option<UsdValue>,
    high_24h: Option<UsdValue>,
    low_24h: Option<UsdValue>,
    price_change_percentage_24h: Option<f64>,
    price_change_percentage_7d: Option<f64>,
    price_change_percentage_30d: Option<f64>,
    market_cap_rank: Option<u32>,
    circulating_supply: Option<f64>,
}

/// `/coins/{id}` payload, reduced to the fields we read.
#[derive(Debug, Deserialize)]
pub struct CoinDetail {
    pub id: String,
    pub symbol: String,
    pub name: String,
    market_cap_rank: Option<u32>,
    image: Option<CoinImage>,
    description: Option<LocalizedText>,
    market_data: Option<CoinMarketData>,
}

impl CoinDetail {
    pub fn description(&self) -> Option<&str> {
        self.description
            .as_ref()
            .and_then(|d| d.en.as_deref())
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }

    pub fn into_snapshot(self) -> CoinSnapshot {
        let market = self.market_data.unwrap_or_default();
        let image = self.image.and_then(|i| i.large.or(i.small));

        CoinSnapshot {
            symbol: self.symbol.to_uppercase(),
            id: self.id,
            name: self.name,
            image,
            price: usd(&market.current_price),
            percent_change_24h: market.price_change_percentage_24h,
            percent_change_7d: market.price_change_percentage_7d,
            percent_change_30d: market.price_change_percentage_30d,
            market_cap: usd(&market.market_cap),
            volume_24h: usd(&market.total_volume),
            rank: self.market_cap_rank.or(market.market_cap_rank),
            high_24h: usd(&market.high_24h),
            low_24h: usd(&market.low_24h),
            circulating_supply: market.circulating_supply,
        }
    }
}

/// One row of `/coins/markets`.
#[derive(Debug, Clone, Deserialize)]
struct MarketEntry {
    id: String,
    symbol: String,
    name: String,
    image: Option<String>,
    current_price: Option<f64>,
    market_cap: Option<f64>,
    market_cap_rank: Option<u32>,
    total_volume: Option<f64>,
    high_24h: Option<f64>,
    low_24h: Option<f64>,
    price_change_percentage_24h: Option<f64>,
    price_change_percentage_7d_in_currency: Option<f64>,
    price_change_percentage_30d_in_currency: Option<f64>,
    circulating_supply: Option<f64>,
}

impl From<MarketEntry> for CoinSnapshot {
    fn from(entry: MarketEntry) -> Self {
        CoinSnapshot {
            symbol: entry.symbol.to_uppercase(),
            id: entry.id,
            name: entry.name,
            image: entry.image,
            price: entry.current_price,
            percent_change_24h: entry.price_change_percentage_24h,
            percent_change_7d: entry.price_change_percentage_7d_in_currency,
            percent_change_30d: entry.price_change_percentage_30d_in_currency,
            market_cap: entry.market_cap,
            volume_24h: entry.total_volume,
            rank: entry.market_cap_rank,
            high_24h: entry.high_24h,
            low_24h: entry.low_24h,
            circulating_supply: entry.circulating_supply,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    coins: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCoinListItem {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub activated_at: Option<i64>, // Unix timestamp
}

impl NewCoinListItem {
    pub fn activated_at(&self) -> Option<DateTime<Utc>> {
        self.activated_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
    }
}

impl CoinGeckoService {
    pub fn new(
        client: Client,
        api_key: Option<String>,
        base_url: String,
        symbols: Arc<SymbolTable>,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            symbols,
        }
    }

    fn key_header(&self) -> &'static str {
        if self.base_url.contains("pro-api") {
            "x-cg-pro-api-key"
        } else {
            "x-cg-demo-api-key"
        }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let request = self.client.get(url).header("accept", "application/json");
        match &self.api_key {
            Some(key) => request.header(self.key_header(), key),
            None => request,
        }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        retry: &RetryPolicy,
    ) -> Result<T, MarketDataError> {
        send_json(SERVICE, request, retry).await
    }

    /// Current price and stats for a whitelisted ticker symbol.
    pub async fn get_price(&self, symbol: &str) -> Result<CoinSnapshot, MarketDataError> {
        let coin_id = self
            .symbols
            .coin_id(symbol)
            .ok_or_else(|| MarketDataError::UnknownSymbol {
                symbol: symbol.to_string(),
            })?;

        tracing::info!("Fetching price for {} ({}) from CoinGecko", symbol, coin_id);

        let detail = self.get_coin_detail(coin_id, &RetryPolicy::NONE).await?;
        let mut snapshot = detail.into_snapshot();
        snapshot.symbol = symbol.trim().to_uppercase();

        Ok(snapshot)
    }

    /// Full coin record, including the long-form description.
    pub async fn get_coin_detail(
        &self,
        coin_id: &str,
        retry: &RetryPolicy,
    ) -> Result<CoinDetail, MarketDataError> {
        let request = self.get(&format!("/coins/{}", coin_id)).query(&[
            ("localization", "false"),
            ("tickers", "false"),
            ("community_data", "false"),
            ("developer_data", "false"),
        ]);

        self.fetch(request, retry).await
    }

    /// Top `limit` coins by market cap, largest first.
    pub async fn get_top_list(&self, limit: u32) -> Result<Vec<CoinSnapshot>, MarketDataError> {
        tracing::info!("Fetching top {} coins from CoinGecko", limit);

        let per_page = limit.to_string();
        let request = self.get("/coins/markets").query(&[
            ("vs_currency", "usd"),
            ("order", "market_cap_desc"),
            ("per_page", per_page.as_str()),
            ("page", "1"),
            ("price_change_percentage", "7d,30d"),
        ]);

        let entries: Vec<MarketEntry> = self.fetch(request, &RetryPolicy::NONE).await?;
        let coins = rank_by_market_cap(entries.into_iter().map(CoinSnapshot::from).collect(), limit as usize);

        tracing::debug!("Fetched {} top coins", coins.len());

        Ok(coins)
    }

    /// Free-text search, then market data for the first `limit` hits.
    /// Results keep search relevance order.
    pub async fn search_coins(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<CoinSnapshot>, MarketDataError> {
        tracing::info!("Searching CoinGecko for '{}'", query);

        // Search for matching coin ids
        let request = self.get("/search").query(&[("query", query)]);
        let search: SearchResponse = self.fetch(request, &RetryPolicy::NONE).await?;

        let ids: Vec<String> = search
            .coins
            .into_iter()
            .take(limit as usize)
            .map(|hit| hit.id)
            .collect();

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // Fetch market data for the hits in one call
        let joined = ids.join(",");
        let request = self.get("/coins/markets").query(&[
            ("vs_currency", "usd"),
            ("ids", joined.as_str()),
            ("price_change_percentage", "7d,30d"),
        ]);
        let entries: Vec<MarketEntry> = self.fetch(request, &RetryPolicy::NONE).await?;

        Ok(order_by_ids(entries.into_iter().map(CoinSnapshot::from).collect(), &ids))
    }

    /// Recently listed coins, newest first.
    pub async fn fetch_new_coins_list(&self) -> Result<Vec<NewCoinListItem>, MarketDataError> {
        tracing::info!("Fetching NEW coins from CoinGecko /coins/list/new");

        let new_coins: Vec<NewCoinListItem> = self
            .fetch(self.get("/coins/list/new"), &RetryPolicy::NONE)
            .await?;

        tracing::info!("Fetched {} new coins from CoinGecko", new_coins.len());

        Ok(new_coins)
    }
}

/// Sort by market cap descending (missing caps last) and keep `limit`.
fn rank_by_market_cap(mut coins: Vec<CoinSnapshot>, limit: usize) -> Vec<CoinSnapshot> {
    coins.sort_by(|a, b| match (a.market_cap, b.market_cap) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    coins.truncate(limit);
    coins
}

fn order_by_ids(coins: Vec<CoinSnapshot>, ids: &[String]) -> Vec<CoinSnapshot> {
    let mut by_id: HashMap<String, CoinSnapshot> =
        coins.into_iter().map(|c| (c.id.clone(), c)).collect();
    ids.iter().filter_map(|id| by_id.remove(id)).collect()
}
