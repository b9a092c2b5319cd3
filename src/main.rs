use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cryptochat_backend::{AppState, config::Config, router};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,cryptochat_backend=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Invalid configuration");

    let state = AppState::from_config(&config).expect("Failed to build HTTP client");

    tracing::info!(
        "Gemini AI ({}): {}",
        state.gemini.model(),
        if state.gemini.is_configured() { "configured" } else { "missing GEMINI_API_KEY" }
    );
    tracing::info!(
        "CoinGecko: {}",
        if config.coingecko_api_key.is_some() { "API key configured" } else { "public tier (no API key)" }
    );

    // Build router
    let app = router(state)
        .layer(config.cors_layer())
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");

    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app).await.expect("Server error");
}
