use axum::http::{HeaderValue, Method, header};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use crate::error::ConfigError;
use crate::services::upstream::RetryPolicy;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-pro";
pub const DEFAULT_COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_GECKOTERMINAL_BASE_URL: &str = "https://api.geckoterminal.com/api/v2";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Empty means any origin is accepted.
    pub allowed_origins: Vec<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    pub gemini_model: String,
    pub coingecko_api_key: Option<String>,
    pub coingecko_base_url: String,
    pub geckoterminal_base_url: String,
    pub http_timeout: Duration,
    pub new_listings: NewListingsConfig,
}

#[derive(Debug, Clone)]
pub struct NewListingsConfig {
    pub limit: usize,
    pub concurrency: usize,
    pub retry: RetryPolicy,
    pub description_chars: usize,
}

impl Default for NewListingsConfig {
    fn default() -> Self {
        Self {
            limit: 10,
            concurrency: 3,
            retry: RetryPolicy {
                max_retries: 3,
                base_delay: Duration::from_millis(1000),
                max_delay: Duration::from_secs(30),
            },
            description_chars: 150,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            allowed_origins: Vec::new(),
            gemini_api_key: None,
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            coingecko_api_key: None,
            coingecko_base_url: DEFAULT_COINGECKO_BASE_URL.to_string(),
            geckoterminal_base_url: DEFAULT_GECKOTERMINAL_BASE_URL.to_string(),
            http_timeout: Duration::from_secs(30),
            new_listings: NewListingsConfig::default(),
        }
    }
}

impl Config {
    /// Build configuration from the process environment.
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as `from_env` but reads variables through `lookup`, which keeps
    /// parsing testable without touching the real environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let new_listings = NewListingsConfig {
            limit: parse_or("NEW_LISTINGS_LIMIT", get("NEW_LISTINGS_LIMIT"), defaults.new_listings.limit)?,
            concurrency: parse_or(
                "NEW_LISTINGS_CONCURRENCY",
                get("NEW_LISTINGS_CONCURRENCY"),
                defaults.new_listings.concurrency,
            )?
            .max(1),
            retry: RetryPolicy {
                max_retries: parse_or(
                    "NEW_LISTINGS_MAX_RETRIES",
                    get("NEW_LISTINGS_MAX_RETRIES"),
                    defaults.new_listings.retry.max_retries,
                )?,
                base_delay: Duration::from_millis(parse_or(
                    "NEW_LISTINGS_RETRY_DELAY_MS",
                    get("NEW_LISTINGS_RETRY_DELAY_MS"),
                    defaults.new_listings.retry.base_delay.as_millis() as u64,
                )?),
                max_delay: Duration::from_millis(parse_or(
                    "NEW_LISTINGS_MAX_RETRY_DELAY_MS",
                    get("NEW_LISTINGS_MAX_RETRY_DELAY_MS"),
                    defaults.new_listings.retry.max_delay.as_millis() as u64,
                )?),
            },
            description_chars: defaults.new_listings.description_chars,
        };

        Ok(Self {
            port: parse_or("PORT", get("PORT"), defaults.port)?,
            allowed_origins: get("ALLOWED_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_base_url: get("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            coingecko_api_key: get("COINGECKO_API_KEY"),
            coingecko_base_url: get("COINGECKO_BASE_URL").unwrap_or(defaults.coingecko_base_url),
            geckoterminal_base_url: get("GECKOTERMINAL_BASE_URL")
                .unwrap_or(defaults.geckoterminal_base_url),
            http_timeout: Duration::from_secs(parse_or(
                "HTTP_TIMEOUT_SECS",
                get("HTTP_TIMEOUT_SECS"),
                defaults.http_timeout.as_secs(),
            )?),
            new_listings,
        })
    }

    /// Shared outbound HTTP client. Every upstream call inherits the timeout.
    pub fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .timeout(self.http_timeout)
            .build()
    }

    pub fn cors_layer(&self) -> CorsLayer {
        let layer = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::ACCEPT, header::AUTHORIZATION, header::CONTENT_TYPE]);

        if self.allowed_origins.is_empty() {
            return layer.allow_origin(Any);
        }

        let origins: Vec<HeaderValue> = self
            .allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                    None
                }
            })
            .collect();

        layer.allow_origin(origins)
    }
}

fn parse_or<T: FromStr>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        None => Ok(default),
    }
}
