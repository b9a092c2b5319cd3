use crate::AppState;
use crate::error::{GenerationError, MarketDataError};
use crate::models::chat::Message;
use crate::services::intent::{Intent, PoolQuery, detect_intents, latest_user_message};
use crate::services::prompt::{
    LiveDataSection, compose_prompt, new_coins_section, no_pools_section, pools_section,
    price_section, top_list_section,
};

/// Detect -> fetch -> compose -> generate, for one chat request.
pub struct ChatPipeline<'a> {
    state: &'a AppState,
}

impl<'a> ChatPipeline<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    pub async fn answer(&self, messages: &[Message]) -> Result<String, GenerationError> {
        let prompt = self.build_prompt(messages).await;
        self.state.gemini.generate(&prompt).await
    }

    /// Prompt for `messages`, augmented with whatever live data the latest
    /// user message asks for. Failed lookups are logged and skipped.
    pub async fn build_prompt(&self, messages: &[Message]) -> String {
        let intents = latest_user_message(messages)
            .map(|text| detect_intents(text, &self.state.symbols))
            .unwrap_or_default();

        tracing::info!("Chat request: {} messages, {} intents", messages.len(), intents.len());

        // Sequential on purpose: one upstream call in flight per request.
        let mut sections = Vec::with_capacity(intents.len());
        for intent in &intents {
            if let Some(section) = self.section_for(intent).await {
                sections.push(section);
            }
        }

        compose_prompt(&sections, messages)
    }

    async fn section_for(&self, intent: &Intent) -> Option<LiveDataSection> {
        let result = match intent {
            Intent::Price { symbol, .. } => self
                .state
                .coingecko
                .get_price(symbol)
                .await
                .map(|coin| price_section(&coin)),
            Intent::TopList { limit } => self
                .state
                .coingecko
                .get_top_list(*limit)
                .await
                .map(|coins| top_list_section(&coins)),
            Intent::Pools(query) => self.pools_for(query).await,
            Intent::NewCoins => self
                .state
                .new_listings
                .fetch_new_listings()
                .await
                .map(|coins| new_coins_section(&coins)),
        };

        match result {
            Ok(section) => Some(section),
            Err(e) => {
                tracing::warn!("Skipping live data for {:?}: {}", intent, e);
                None
            }
        }
    }

    async fn pools_for(&self, query: &PoolQuery) -> Result<LiveDataSection, MarketDataError> {
        let geckoterminal = &self.state.geckoterminal;
        match query {
            PoolQuery::Pair {
                token_a,
                token_b,
                network,
            } => match geckoterminal.search_pool(token_a, token_b, network).await {
                Ok(pools) => Ok(pools_section(query, &pools)),
                Err(e @ MarketDataError::NoPoolsFound { .. }) => {
                    Ok(no_pools_section(query, &e.to_string()))
                }
                Err(e) => Err(e),
            },
            PoolQuery::Top { network } => geckoterminal
                .get_pools(network, 1)
                .await
                .map(|pools| pools_section(query, &pools)),
        }
    }
}
