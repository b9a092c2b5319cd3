use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
};

use crate::{
    AppState,
    models::{
        coin::{CoinSnapshot, CoinSummary, CoinsResponse, SearchCoinsQuery, TopCryptosQuery},
        common::ErrorResponse,
    },
};

fn invalid_query(rejection: QueryRejection) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::with_details("Invalid query parameters", rejection.body_text())),
    )
}

/// Handler for GET /api/top-cryptos
/// Top coins by market cap, largest first.
pub async fn get_top_cryptos(
    State(state): State<AppState>,
    query: Result<Query<TopCryptosQuery>, QueryRejection>,
) -> Result<Json<CoinsResponse<CoinSnapshot>>, (StatusCode, Json<ErrorResponse>)> {
    let Query(query) = query.map_err(invalid_query)?;
    let limit = query
        .validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e))))?;

    match state.coingecko.get_top_list(limit).await {
        Ok(coins) => Ok(Json(CoinsResponse { coins })),
        Err(e) => {
            tracing::error!("Top cryptos endpoint error: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(e.to_string())),
            ))
        }
    }
}

/// Handler for GET /api/search-coins
/// Free-text coin search with market data for the best matches.
pub async fn search_coins(
    State(state): State<AppState>,
    query: Result<Query<SearchCoinsQuery>, QueryRejection>,
) -> Result<Json<CoinsResponse<CoinSummary>>, (StatusCode, Json<ErrorResponse>)> {
    let Query(query) = query.map_err(invalid_query)?;
    let (search, limit) = query
        .validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e))))?;

    match state.coingecko.search_coins(&search, limit).await {
        Ok(coins) => {
            tracing::info!("Search '{}' matched {} coins", search, coins.len());
            Ok(Json(CoinsResponse {
                coins: coins.into_iter().map(CoinSummary::from).collect(),
            }))
        }
        Err(e) => {
            tracing::error!("Search coins endpoint error: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::with_details("Failed to search coins", e)),
            ))
        }
    }
}
