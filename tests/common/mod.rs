#![allow(dead_code)]

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use cryptochat_backend::{
    AppState,
    config::{Config, NewListingsConfig},
    router,
    services::{symbols::SymbolTable, upstream::RetryPolicy},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceExt;

pub const GEMINI_KEY: &str = "test-gemini-key";
pub const GEMINI_MODEL: &str = "gemini-test";

/// Requests seen by the mock upstream.
#[derive(Clone, Default)]
pub struct MockState {
    detail_hits: Arc<Mutex<HashMap<String, u32>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockState {
    fn record_hit(&self, coin_id: &str) -> u32 {
        let mut hits = self.detail_hits.lock().unwrap();
        let count = hits.entry(coin_id.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Number of `/coins/{id}` calls made for `coin_id`.
    pub fn detail_hits(&self, coin_id: &str) -> u32 {
        self.detail_hits
            .lock()
            .unwrap()
            .get(coin_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

/// CoinGecko, GeckoTerminal and Gemini stand-ins served from one local port.
pub struct MockUpstream {
    pub base_url: String,
    pub state: MockState,
}

impl MockUpstream {
    pub fn coingecko_url(&self) -> String {
        format!("{}/coingecko", self.base_url)
    }

    pub fn geckoterminal_url(&self) -> String {
        format!("{}/geckoterminal", self.base_url)
    }

    pub fn gemini_url(&self) -> String {
        format!("{}/gemini", self.base_url)
    }

    /// A base URL under which every request 404s.
    pub fn dead_url(&self) -> String {
        format!("{}/nowhere", self.base_url)
    }
}

pub async fn spawn_mock_upstream() -> MockUpstream {
    let state = MockState::default();

    let coingecko = Router::new()
        .route("/coins/markets", get(coin_markets))
        .route("/coins/list/new", get(new_coins_list))
        .route("/coins/{id}", get(coin_detail))
        .route("/search", get(search));

    let geckoterminal = Router::new()
        .route("/networks/trending_pools", get(trending_pools))
        .route("/networks/{network}/pools", get(network_pools));

    let gemini = Router::new().route("/models/{action}", post(generate_content));

    let app = Router::new()
        .nest("/coingecko", coingecko)
        .nest("/geckoterminal", geckoterminal)
        .nest("/gemini", gemini)
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockUpstream {
        base_url: format!("http://{}", addr),
        state,
    }
}

/// Configuration pointing every upstream at `mock`, with fast retries.
pub fn test_config(mock: &MockUpstream) -> Config {
    Config {
        gemini_api_key: Some(GEMINI_KEY.to_string()),
        gemini_base_url: mock.gemini_url(),
        gemini_model: GEMINI_MODEL.to_string(),
        coingecko_api_key: Some("cg-test-key".to_string()),
        coingecko_base_url: mock.coingecko_url(),
        geckoterminal_base_url: mock.geckoterminal_url(),
        http_timeout: Duration::from_secs(5),
        new_listings: NewListingsConfig {
            retry: RetryPolicy {
                max_retries: 2,
                base_delay: Duration::from_millis(5),
                max_delay: Duration::from_millis(50),
            },
            ..NewListingsConfig::default()
        },
        ..Config::default()
    }
}

pub fn build_app(config: &Config) -> Router {
    router(AppState::from_config(config).unwrap())
}

pub async fn test_app() -> (Router, MockUpstream) {
    let mock = spawn_mock_upstream().await;
    let app = build_app(&test_config(&mock));
    (app, mock)
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

pub async fn post_raw(app: Router, uri: &str, body: impl Into<Body>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    post_raw(app, uri, body.to_string()).await
}

// ---------------------------------------------------------------------------
// CoinGecko fixtures
// ---------------------------------------------------------------------------

fn market_row(id: &str, symbol: &str, name: &str, price: f64, cap: Option<f64>, change: f64) -> Value {
    json!({
        "id": id,
        "symbol": symbol,
        "name": name,
        "image": format!("https://assets.example/{}.png", id),
        "current_price": price,
        "market_cap": cap,
        "market_cap_rank": null,
        "total_volume": price * 1_000.0,
        "high_24h": price * 1.02,
        "low_24h": price * 0.98,
        "price_change_percentage_24h": change,
        "price_change_percentage_7d_in_currency": change * 2.0,
        "price_change_percentage_30d_in_currency": null,
        "circulating_supply": 1_000_000.0
    })
}

/// Top-list rows, deliberately out of market-cap order.
fn top_market_rows() -> Vec<Value> {
    vec![
        market_row("solana", "sol", "Solana", 150.0, Some(7.0e10), 3.1),
        market_row("bitcoin", "btc", "Bitcoin", 65000.5, Some(1.28e12), 1.234),
        market_row("no-cap-coin", "ncc", "No Cap Coin", 0.01, None, 0.0),
        market_row("ripple", "xrp", "XRP", 0.52, Some(3.0e10), -0.8),
        market_row("ethereum", "eth", "Ethereum", 3000.0, Some(3.6e11), -1.5),
        market_row("binancecoin", "bnb", "BNB", 580.0, Some(8.5e10), 0.4),
        market_row("tether", "usdt", "Tether", 1.0, Some(1.1e11), 0.01),
    ]
}

/// Rows only reachable through `ids=`, ordered by market cap like upstream.
fn search_market_rows() -> Vec<Value> {
    vec![
        market_row("wrapped-pepe", "wpepe", "Wrapped Pepe", 0.00002, Some(9.0e8), -4.2),
        market_row("pepe", "pepe", "Pepe", 0.0000123, Some(5.0e8), 12.3456),
    ]
}

async fn coin_markets(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let rows = match params.get("ids") {
        Some(ids) => {
            let wanted: Vec<&str> = ids.split(',').collect();
            top_market_rows()
                .into_iter()
                .chain(search_market_rows())
                .filter(|row| wanted.contains(&row["id"].as_str().unwrap_or_default()))
                .collect()
        }
        None => top_market_rows(),
    };
    Json(Value::Array(rows))
}

async fn search(Query(params): Query<HashMap<String, String>>) -> Response {
    let query = params.get("query").map(String::as_str).unwrap_or_default();
    match query {
        "explode" => (StatusCode::INTERNAL_SERVER_ERROR, "search backend down").into_response(),
        "pepe" => Json(json!({
            "coins": [
                { "id": "pepe", "name": "Pepe", "symbol": "PEPE" },
                { "id": "wrapped-pepe", "name": "Wrapped Pepe", "symbol": "WPEPE" },
                { "id": "pepe-unlisted", "name": "Pepe Unlisted", "symbol": "PEPEU" }
            ],
            "exchanges": [],
            "categories": []
        }))
        .into_response(),
        _ => Json(json!({ "coins": [], "exchanges": [] })).into_response(),
    }
}

/// Detail payload for every default symbol, priced 100, 200, ... in table order.
fn symbol_detail(coin_id: &str) -> Option<Value> {
    let table = SymbolTable::default();
    let (index, entry) = table
        .entries()
        .iter()
        .enumerate()
        .find(|(_, entry)| entry.coin_id == coin_id)?;

    let price = 100.0 * (index as f64 + 1.0);
    // matic-network reports its post-migration ticker upstream
    let upstream_symbol = if coin_id == "matic-network" {
        "pol".to_string()
    } else {
        entry.symbol.to_lowercase()
    };

    Some(json!({
        "id": coin_id,
        "symbol": upstream_symbol,
        "name": format!("{} Coin", entry.symbol),
        "market_cap_rank": index + 1,
        "image": { "large": format!("https://assets.example/{}.png", coin_id) },
        "market_data": {
            "current_price": { "usd": price },
            "market_cap": { "usd": price * 1.0e9 },
            "total_volume": { "usd": price * 1.0e7 },
            "high_24h": { "usd": price * 1.05 },
            "low_24h": { "usd": price * 0.95 },
            "price_change_percentage_24h": 1.5,
            "price_change_percentage_7d": -2.25,
            "price_change_percentage_30d": null,
            "circulating_supply": 21_000_000.0
        }
    }))
}

fn listing_detail(coin_id: &str, name: &str, description: &str) -> Value {
    json!({
        "id": coin_id,
        "symbol": coin_id.split('-').next().unwrap_or(coin_id),
        "name": name,
        "description": { "en": description },
        "market_data": {
            "current_price": { "usd": 0.0042 },
            "market_cap": { "usd": 4_200_000.0 },
            "total_volume": { "usd": 125_000.0 },
            "price_change_percentage_24h": 42.0
        }
    })
}

pub fn long_description() -> String {
    "Fresh Token is a community experiment in on-chain coordination. ".repeat(5)
}

async fn coin_detail(State(state): State<MockState>, Path(id): Path<String>) -> Response {
    let hits = state.record_hit(&id);

    match id.as_str() {
        "flaky-token" if hits == 1 => (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, "0")],
            Json(json!({ "status": { "error_code": 429, "error_message": "rate limited" } })),
        )
            .into_response(),
        "always-busy" => (StatusCode::SERVICE_UNAVAILABLE, "upstream busy").into_response(),
        "rate-limited-for-an-hour" => (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, "3600")],
            Json(json!({ "status": { "error_code": 429, "error_message": "rate limited" } })),
        )
            .into_response(),
        "fresh-token" => {
            Json(listing_detail("fresh-token", "Fresh Token", &long_description())).into_response()
        }
        "flaky-token" => {
            Json(listing_detail("flaky-token", "Flaky Token", "Needs a second try.")).into_response()
        }
        _ => match symbol_detail(&id) {
            Some(detail) => Json(detail).into_response(),
            None => (StatusCode::NOT_FOUND, Json(json!({ "error": "coin not found" }))).into_response(),
        },
    }
}

async fn new_coins_list() -> Json<Value> {
    Json(json!([
        { "id": "fresh-token", "symbol": "fresh", "name": "Fresh Token", "activated_at": 1_700_000_000 },
        { "id": "flaky-token", "symbol": "flaky", "name": "Flaky Token", "activated_at": 1_699_990_000 },
        { "id": "broken-token", "symbol": "broke", "name": "Broken Token", "activated_at": 1_699_980_000 }
    ]))
}

// ---------------------------------------------------------------------------
// GeckoTerminal fixtures
// ---------------------------------------------------------------------------

fn pool(network: &str, address: &str, name: &str, base: &str, quote: &str, dex: &str) -> Value {
    json!({
        "id": format!("{}_{}", network, address),
        "type": "pool",
        "attributes": {
            "name": name,
            "address": address,
            "base_token_price_usd": "3012.55",
            "reserve_in_usd": "250000000.5",
            "volume_usd": { "h1": "1000", "h24": "98000000" },
            "price_change_percentage": { "h1": "0.1", "h24": "-1.25" }
        },
        "relationships": {
            "base_token": { "data": { "id": format!("{}_{}", network, base), "type": "token" } },
            "quote_token": { "data": { "id": format!("{}_{}", network, quote), "type": "token" } },
            "dex": { "data": { "id": dex, "type": "dex" } }
        }
    })
}

fn token(network: &str, symbol: &str) -> Value {
    json!({
        "id": format!("{}_{}", network, symbol),
        "type": "token",
        "attributes": { "symbol": symbol, "name": symbol }
    })
}

fn eth_pools() -> Value {
    json!({
        "data": [
            pool("eth", "0x88e6", "WETH / USDC 0.05%", "WETH", "USDC", "uniswap_v3"),
            pool("eth", "0xa43f", "PEPE / WETH 0.3%", "PEPE", "WETH", "uniswap_v3"),
            pool("eth", "0x9db9", "WBTC / USDT 0.3%", "WBTC", "USDT", "uniswap_v3")
        ],
        "included": [
            token("eth", "WETH"),
            token("eth", "USDC"),
            token("eth", "PEPE"),
            token("eth", "WBTC"),
            token("eth", "USDT"),
            { "id": "uniswap_v3", "type": "dex", "attributes": { "name": "Uniswap V3" } }
        ]
    })
}

async fn network_pools(Path(network): Path<String>) -> Response {
    match network.as_str() {
        "eth" => Json(eth_pools()).into_response(),
        "unknown_chain" => (StatusCode::NOT_FOUND, Json(json!({ "errors": [{ "status": "404" }] }))).into_response(),
        _ => Json(json!({ "data": [], "included": [] })).into_response(),
    }
}

async fn trending_pools() -> Json<Value> {
    Json(json!({
        "data": [
            pool("solana", "So1abc", "BONK / SOL", "BONK", "SOL", "raydium"),
            pool("eth", "0x88e6", "WETH / USDC 0.05%", "WETH", "USDC", "uniswap_v3")
        ],
        "included": [
            token("solana", "BONK"),
            token("solana", "SOL"),
            token("eth", "WETH"),
            token("eth", "USDC")
        ]
    }))
}

// ---------------------------------------------------------------------------
// Gemini
// ---------------------------------------------------------------------------

/// Replies with "ECHO:" followed by the prompt it received.
async fn generate_content(
    State(state): State<MockState>,
    Path(action): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some(GEMINI_KEY) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": { "code": 403, "message": "API key not valid" } })),
        )
            .into_response();
    }
    if action != format!("{}:generateContent", GEMINI_MODEL) {
        return (StatusCode::NOT_FOUND, "unknown model").into_response();
    }

    let prompt = body["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    state.prompts.lock().unwrap().push(prompt.clone());

    Json(json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": "ECHO:" }, { "text": prompt }] },
            "finishReason": "STOP"
        }]
    }))
    .into_response()
}
