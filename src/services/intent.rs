//! Keyword-driven detection of the live data a chat message asks for.
//!
//! Matching is plain substring matching on the lower-cased message, so some
//! false positives are expected ("down" counts as a price keyword, "stop"
//! contains "top").

use lazy_static::lazy_static;
use regex::Regex;

use crate::services::symbols::SymbolTable;

pub const TOP_LIST_LIMIT: u32 = 10;
pub const DEFAULT_NETWORK: &str = "eth";

const PRICE_KEYWORDS: &[&str] = &[
    "price",
    "cost",
    "worth",
    "value",
    "market cap",
    "volume",
    "change",
    "trading at",
    "how much",
    "pump",
    "dump",
    "down",
];

const POOL_KEYWORDS: &[&str] = &[
    "pool",
    "liquidity",
    "dex",
    "uniswap",
    "pancakeswap",
    "trading pair",
];

const NEW_COIN_KEYWORDS: &[&str] = &[
    "new coin",
    "new token",
    "newly listed",
    "just listed",
    "recently added",
    "latest coin",
    "new release",
];

/// (alias found in the message, GeckoTerminal network id). First hit wins.
const NETWORK_ALIASES: &[(&str, &str)] = &[
    ("solana", "solana"),
    ("binance smart chain", "bsc"),
    ("bsc", "bsc"),
    ("polygon", "polygon_pos"),
    ("arbitrum", "arbitrum"),
    ("avalanche", "avax"),
    ("optimism", "optimism"),
    ("base", "base"),
    ("ethereum", "eth"),
];

/// Words that can precede a quote token without being the other half of a pair.
const PAIR_STOPWORDS: &[&str] = &[
    "about", "an", "and", "are", "best", "between", "dex", "for", "in", "is", "me", "my", "of",
    "on", "or", "pair", "pairs", "pool", "pools", "price", "show", "the", "to", "top", "vs",
    "what", "with",
];

lazy_static! {
    // "<token>/<quote>" where quote is a stablecoin or major
    static ref SLASH_PAIR_REGEX: Regex = Regex::new(
        r"(?i)\b([a-z0-9]{2,10})\s*/\s*(usdc|usdt|dai|busd|weth|eth|wbtc|btc|wbnb|bnb|sol)\b"
    )
    .unwrap();

    // "<token> <quote>"
    static ref SPACE_PAIR_REGEX: Regex = Regex::new(
        r"(?i)\b([a-z0-9]{2,10})\s+(usdc|usdt|dai|busd|weth|eth|wbtc|btc|wbnb|bnb|sol)\b"
    )
    .unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub enum PoolQuery {
    /// A specific token pair, e.g. PEPE/WETH.
    Pair {
        token_a: String,
        token_b: String,
        network: String,
    },
    /// Top pools on a network.
    Top { network: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Price { symbol: String, coin_id: String },
    TopList { limit: u32 },
    Pools(PoolQuery),
    NewCoins,
}

type Extractor = fn(&str, &SymbolTable) -> Option<Intent>;

pub struct IntentRule {
    pub name: &'static str,
    extract: Extractor,
}

/// Evaluation order is also the order of the live-data sections in the prompt.
pub const INTENT_RULES: &[IntentRule] = &[
    IntentRule {
        name: "price",
        extract: detect_price,
    },
    IntentRule {
        name: "top-list",
        extract: detect_top_list,
    },
    IntentRule {
        name: "pools",
        extract: detect_pools,
    },
    IntentRule {
        name: "new-coins",
        extract: detect_new_coins,
    },
];

/// Every intent implied by `message`, in rule order. Rules are independent.
pub fn detect_intents(message: &str, symbols: &SymbolTable) -> Vec<Intent> {
    let lowered = message.to_lowercase();

    INTENT_RULES
        .iter()
        .filter_map(|rule| {
            let intent = (rule.extract)(&lowered, symbols);
            if intent.is_some() {
                tracing::debug!("Intent '{}' detected", rule.name);
            }
            intent
        })
        .collect()
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

fn detect_price(text: &str, symbols: &SymbolTable) -> Option<Intent> {
    if !contains_any(text, PRICE_KEYWORDS) {
        return None;
    }

    symbols
        .entries()
        .iter()
        .find(|entry| {
            text.contains(&entry.symbol.to_lowercase()) || text.contains(entry.coin_id.as_str())
        })
        .map(|entry| Intent::Price {
            symbol: entry.symbol.clone(),
            coin_id: entry.coin_id.clone(),
        })
}

fn detect_top_list(text: &str, _symbols: &SymbolTable) -> Option<Intent> {
    (text.contains("top") && (text.contains("crypto") || text.contains("coin"))).then_some(
        Intent::TopList {
            limit: TOP_LIST_LIMIT,
        },
    )
}

fn detect_pools(text: &str, _symbols: &SymbolTable) -> Option<Intent> {
    if !contains_any(text, POOL_KEYWORDS) {
        return None;
    }

    let network = detect_network(text);

    // Specific pair if one is named, otherwise top pools on the network
    let query = match extract_pair(text) {
        Some((token_a, token_b)) => PoolQuery::Pair {
            token_a,
            token_b,
            network,
        },
        None => PoolQuery::Top { network },
    };

    Some(Intent::Pools(query))
}

/// Token pair mentioned in `text`. Slash-separated pairs win over
/// space-separated ones; "for eth" and similar are skipped.
fn extract_pair(text: &str) -> Option<(String, String)> {
    // Try "pepe/weth" first
    if let Some(caps) = SLASH_PAIR_REGEX.captures(text) {
        return Some((caps[1].to_uppercase(), caps[2].to_uppercase()));
    }

    // Fall back to "bonk sol", scanning past filler words
    let mut start = 0;
    while let Some(caps) = SPACE_PAIR_REGEX.captures_at(text, start) {
        let token = &caps[1];
        if !PAIR_STOPWORDS.contains(&token.to_lowercase().as_str()) {
            return Some((token.to_uppercase(), caps[2].to_uppercase()));
        }
        // retry from the quote token, it may start a pair of its own
        start = caps.get(2)?.start();
    }

    None
}

fn detect_new_coins(text: &str, _symbols: &SymbolTable) -> Option<Intent> {
    contains_any(text, NEW_COIN_KEYWORDS).then_some(Intent::NewCoins)
}

fn detect_network(text: &str) -> String {
    NETWORK_ALIASES
        .iter()
        .find(|(alias, _)| text.contains(alias))
        .map(|(_, network)| network.to_string())
        .unwrap_or_else(|| DEFAULT_NETWORK.to_string())
}

/// Text of the most recent user message, if any.
pub fn latest_user_message(messages: &[crate::models::chat::Message]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == crate::models::chat::Role::User)
        .map(|m| m.content.as_str())
}
