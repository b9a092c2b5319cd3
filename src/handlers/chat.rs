use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde_json::Value;

use crate::{
    AppState,
    models::{
        chat::{ChatResponse, Message},
        common::ErrorResponse,
    },
    services::chat::ChatPipeline,
};

const INVALID_MESSAGES: &str = "Invalid messages format";

/// Handler for POST /api/chat
/// Augments the conversation with live market data and asks Gemini for a reply.
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorResponse>)> {
    let messages = payload
        .map_err(|e| {
            tracing::debug!("Rejected chat body: {}", e);
            bad_request()
        })
        .and_then(|Json(body)| parse_messages(body).ok_or_else(bad_request))?;

    match ChatPipeline::new(&state).answer(&messages).await {
        Ok(message) => Ok(Json(ChatResponse { message })),
        Err(e) => {
            tracing::error!("Gemini API error: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::with_details("Failed to get response", e)),
            ))
        }
    }
}

/// `messages` must be present and an array of `{role, content}` objects.
fn parse_messages(mut body: Value) -> Option<Vec<Message>> {
    let messages = body.get_mut("messages")?.take();
    if !messages.is_array() {
        return None;
    }
    serde_json::from_value(messages).ok()
}

fn bad_request() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(INVALID_MESSAGES)),
    )
}
