// src/lib.rs

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::config::Config;
use crate::services::{
    coingecko::CoinGeckoService, gemini::GeminiService, geckoterminal::GeckoTerminalService,
    new_listings::NewListingsService, symbols::SymbolTable,
};

#[derive(Clone)]
pub struct AppState {
    pub coingecko: CoinGeckoService,
    pub geckoterminal: GeckoTerminalService,
    pub new_listings: NewListingsService,
    pub gemini: GeminiService,
    pub symbols: Arc<SymbolTable>,
}

impl AppState {
    /// Wire every upstream client from configuration. All clients share one
    /// connection pool and the configured timeout.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let client = config.http_client()?;
        let symbols = Arc::new(SymbolTable::default());

        let coingecko = CoinGeckoService::new(
            client.clone(),
            config.coingecko_api_key.clone(),
            config.coingecko_base_url.clone(),
            symbols.clone(),
        );
        let geckoterminal =
            GeckoTerminalService::new(client.clone(), config.geckoterminal_base_url.clone());
        let new_listings = NewListingsService::new(coingecko.clone(), config.new_listings.clone());
        let gemini = GeminiService::new(
            client,
            config.gemini_api_key.clone(),
            config.gemini_base_url.clone(),
            config.gemini_model.clone(),
        );

        Ok(Self {
            coingecko,
            geckoterminal,
            new_listings,
            gemini,
            symbols,
        })
    }
}

/// All API routes. CORS and request tracing layers are added by the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(handlers::chat::chat))
        .route("/api/top-cryptos", get(handlers::market::get_top_cryptos))
        .route("/api/search-coins", get(handlers::market::search_coins))
        .route("/api/health", get(handlers::health::health))
        .with_state(state)
}

pub mod config;
pub mod error;

pub mod services {
    pub mod chat;
    pub mod coingecko;
    pub mod format_utils;
    pub mod geckoterminal;
    pub mod gemini;
    pub mod intent;
    pub mod new_listings;
    pub mod prompt;
    pub mod symbols;
    pub mod upstream;
}

pub mod models;

pub mod handlers {
    pub mod chat;
    pub mod health;
    pub mod market;
}
