use std::fmt::Write;

use crate::models::chat::{Message, Role};
use crate::models::coin::{CoinSnapshot, NewCoinSnapshot};
use crate::models::pool::PoolSnapshot;
use crate::services::format_utils::{
    format_percent, format_price, format_rank, format_usd_compact, NOT_AVAILABLE,
};
use crate::services::intent::PoolQuery;

pub const CRYPTO_SYSTEM_PROMPT: &str = "You are a cryptocurrency expert assistant. You ONLY answer questions about:
- Cryptocurrencies (Bitcoin, Ethereum, altcoins, etc.)
- Blockchain technology
- DeFi (Decentralized Finance)
- NFTs and Web3
- Crypto trading, market analysis, and trends
- Crypto wallets and security
- Mining and staking

If asked about topics outside cryptocurrency, politely redirect the conversation back to crypto topics. Be helpful, informative, and concise.";

const LIVE_DATA_INSTRUCTION: &str =
    "Use the live market data above when it is relevant to the question, and mention that prices change quickly.";

/// One bracketed block of live data spliced into the prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveDataSection {
    pub title: String,
    pub body: String,
}

impl LiveDataSection {
    fn render(&self, out: &mut String) {
        let _ = write!(out, "[{}]\n{}\n\n", self.title, self.body.trim_end());
    }
}

pub fn price_section(coin: &CoinSnapshot) -> LiveDataSection {
    let mut body = String::new();
    let _ = writeln!(body, "{} ({})", coin.name, coin.symbol);
    let _ = writeln!(body, "Price: {}", format_price(coin.price));
    let _ = writeln!(
        body,
        "Change: 24h {} | 7d {} | 30d {}",
        format_percent(coin.percent_change_24h),
        format_percent(coin.percent_change_7d),
        format_percent(coin.percent_change_30d)
    );
    let _ = writeln!(
        body,
        "24h Range: {} - {}",
        format_price(coin.low_24h),
        format_price(coin.high_24h)
    );
    let _ = writeln!(body, "Market Cap: {}", format_usd_compact(coin.market_cap));
    let _ = writeln!(body, "24h Volume: {}", format_usd_compact(coin.volume_24h));
    let _ = write!(body, "Rank: {}", format_rank(coin.rank));

    LiveDataSection {
        title: format!("LIVE PRICE DATA: {}", coin.symbol),
        body,
    }
}

pub fn top_list_section(coins: &[CoinSnapshot]) -> LiveDataSection {
    let body = coins
        .iter()
        .enumerate()
        .map(|(i, coin)| {
            format!(
                "{}. {} ({}) - {} | 24h {} | Market Cap {}",
                coin.rank.unwrap_or(i as u32 + 1),
                coin.name,
                coin.symbol,
                format_price(coin.price),
                format_percent(coin.percent_change_24h),
                format_usd_compact(coin.market_cap)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    LiveDataSection {
        title: format!("TOP {} CRYPTOCURRENCIES BY MARKET CAP", coins.len()),
        body,
    }
}

pub fn pools_section(query: &PoolQuery, pools: &[PoolSnapshot]) -> LiveDataSection {
    // Title names the pair when one was asked for
    let title = match query {
        PoolQuery::Pair {
            token_a,
            token_b,
            network,
        } => format!("LIQUIDITY POOLS: {}/{} on {}", token_a, token_b, network),
        PoolQuery::Top { network } => format!("TOP LIQUIDITY POOLS on {}", network),
    };

    // One numbered entry per pool, stats on an indented second line
    let body = pools
        .iter()
        .enumerate()
        .map(|(i, pool)| {
            format!(
                "{}. {} ({})\n   Price: {} | Liquidity: {} | 24h Volume: {} | 24h Change: {}",
                i + 1,
                pool.name,
                pool.dex,
                format_price(pool.price_usd),
                format_usd_compact(pool.liquidity),
                format_usd_compact(pool.volume_24h),
                format_percent(pool.price_change_24h)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    LiveDataSection { title, body }
}

/// Section stating that a pair lookup came back empty.
pub fn no_pools_section(query: &PoolQuery, reason: &str) -> LiveDataSection {
    LiveDataSection {
        title: pools_section(query, &[]).title,
        body: reason.to_string(),
    }
}

pub fn new_coins_section(coins: &[NewCoinSnapshot]) -> LiveDataSection {
    // Keep the section even when enrichment found nothing
    let body = if coins.is_empty() {
        "No newly listed coins could be retrieved.".to_string()
    } else {
        coins
            .iter()
            .enumerate()
            .map(|(i, coin)| {
                // Listing time, then market stats
                let listed = coin
                    .activated_at
                    .map(|d| d.format("%Y-%m-%d %H:%M UTC").to_string())
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string());
                let mut line = format!(
                    "{}. {} ({}) - listed {} | Price: {} | 24h {} | Market Cap: {} | 24h Volume: {}",
                    i + 1,
                    coin.name,
                    coin.symbol,
                    listed,
                    format_price(coin.price),
                    format_percent(coin.percent_change_24h),
                    format_usd_compact(coin.market_cap),
                    format_usd_compact(coin.volume_24h)
                );
                // Description goes on its own indented line
                if let Some(description) = &coin.description {
                    let _ = write!(line, "\n   {}", description);
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    LiveDataSection {
        title: "NEWLY LISTED COINS".to_string(),
        body,
    }
}

/// Persona, then live-data sections in the given order, then the whole
/// conversation. Roles other than user/assistant are dropped.
pub fn compose_prompt(sections: &[LiveDataSection], messages: &[Message]) -> String {
    let mut prompt = String::with_capacity(CRYPTO_SYSTEM_PROMPT.len() + 256);
    // Persona first
    prompt.push_str(CRYPTO_SYSTEM_PROMPT);
    prompt.push_str("\n\n");

    if !sections.is_empty() {
        for section in sections {
            section.render(&mut prompt);
        }
        prompt.push_str(LIVE_DATA_INSTRUCTION);
        prompt.push_str("\n\n");
    }

    // Transcript in original order
    for message in messages {
        match message.role {
            Role::User => {
                let _ = write!(prompt, "User: {}\n\n", message.content);
            }
            Role::Assistant => {
                let _ = write!(prompt, "Assistant: {}\n\n", message.content);
            }
            Role::Other => {}
        }
    }

    prompt
}
