use thiserror::Error;

/// Failures from the market-data providers (CoinGecko, GeckoTerminal).
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("Cryptocurrency '{symbol}' is not supported")]
    UnknownSymbol { symbol: String },

    #[error("{service} API error {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} request failed: {source}")]
    Request {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned an unexpected payload: {reason}")]
    Malformed {
        service: &'static str,
        reason: String,
    },

    #[error("No pools found for {token_a}/{token_b} on {network}")]
    NoPoolsFound {
        token_a: String,
        token_b: String,
        network: String,
    },
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("GEMINI_API_KEY is not configured")]
    MissingApiKey,

    #[error("Gemini request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Gemini API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Gemini returned no text (reason: {reason})")]
    EmptyResponse { reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },
}
