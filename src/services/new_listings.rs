use futures_util::stream::{self, StreamExt};

use crate::config::NewListingsConfig;
use crate::error::MarketDataError;
use crate::models::coin::NewCoinSnapshot;
use crate::services::coingecko::{CoinDetail, CoinGeckoService, NewCoinListItem};
use crate::services::format_utils::truncate_chars;

/// Enumerates recently listed coins and enriches each with market data.
#[derive(Clone)]
pub struct NewListingsService {
    coingecko: CoinGeckoService,
    config: NewListingsConfig,
}

impl NewListingsService {
    pub fn new(coingecko: CoinGeckoService, config: NewListingsConfig) -> Self {
        Self { coingecko, config }
    }

    /// Newest listings with details, in upstream order.
    /// Entries whose detail lookup fails are logged and left out.
    pub async fn fetch_new_listings(&self) -> Result<Vec<NewCoinSnapshot>, MarketDataError> {
        let listed = self.coingecko.fetch_new_coins_list().await?;
        let candidates: Vec<NewCoinListItem> = listed.into_iter().take(self.config.limit).collect();
        let total = candidates.len();

        let mut enriched: Vec<(usize, NewCoinSnapshot)> = stream::iter(
            candidates.into_iter().enumerate().map(|(index, item)| async move {
                match self
                    .coingecko
                    .get_coin_detail(&item.id, &self.config.retry)
                    .await
                {
                    Ok(detail) => Some((index, self.to_snapshot(item, detail))),
                    Err(e) => {
                        tracing::warn!("Skipping new listing {}: {}", item.id, e);
                        None
                    }
                }
            }),
        )
        .buffer_unordered(self.config.concurrency.max(1))
        .filter_map(|entry| async move { entry })
        .collect()
        .await;

        enriched.sort_by_key(|(index, _)| *index);

        tracing::info!("Enriched {}/{} new listings", enriched.len(), total);

        Ok(enriched.into_iter().map(|(_, coin)| coin).collect())
    }

    fn to_snapshot(&self, item: NewCoinListItem, detail: CoinDetail) -> NewCoinSnapshot {
        let description = detail
            .description()
            .map(|text| truncate_chars(text, self.config.description_chars));
        let activated_at = item.activated_at();
        let market = detail.into_snapshot();

        NewCoinSnapshot {
            id: item.id,
            name: item.name,
            symbol: item.symbol.to_uppercase(),
            activated_at,
            price: market.price,
            market_cap: market.market_cap,
            volume_24h: market.volume_24h,
            percent_change_24h: market.percent_change_24h,
            description,
        }
    }
}
