//! stock-advisor HTTP Server
//!
//! Axum-based server exposing the allocator, advisory sessions and
//! background news collection as a REST API.

mod config;
mod handlers;
mod routes;
mod state;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stock_advisor::{
    market::{MarketDataSource, SnapshotMarketData},
    news::{NewsArchive, NewsStore},
    universe::StockUniverse,
    InvestmentAdvisor,
};

use crate::config::ServerConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();

    // Stock universe and quotes
    let universe = StockUniverse::from_path(&config.universe_path).with_context(|| {
        format!("loading stock universe from {}", config.universe_path.display())
    })?;
    let market = SnapshotMarketData::from_path(&config.quotes_path).with_context(|| {
        format!("loading quote snapshot from {}", config.quotes_path.display())
    })?;

    if market.health_check().await {
        tracing::info!("✓ {} quotes loaded for {} stocks", market.len(), universe.len());
    } else {
        tracing::warn!("⚠ Quote snapshot is empty - every analysis will fail");
    }

    let mut advisor = InvestmentAdvisor::new(universe, Arc::new(market), config.advisor.clone());

    // News collection
    match &config.news_dir {
        Some(dir) => {
            tracing::info!("✓ News archive at {}", dir.display());
            advisor = advisor.with_news(Arc::new(NewsArchive::new(dir)), NewsStore::new());
            if let Some(save_dir) = &config.news_save_dir {
                tracing::info!("✓ Collected news saved to {}", save_dir.display());
                advisor = advisor.with_news_archive(NewsArchive::new(save_dir));
            }
        }
        None => {
            tracing::warn!("⚠ News collection disabled");
            tracing::warn!("  Set ADVISOR_NEWS_DIR in .env to enable it");
        }
    }

    let app = routes::router(AppState::new(advisor));

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 stock-advisor server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                     - Health check");
    tracing::info!("  POST /api/allocate               - Allocate a budget over candidates");
    tracing::info!("  POST /api/sessions               - Start an advisory session");
    tracing::info!("  GET  /api/sessions/{{id}}          - Session state");
    tracing::info!("  POST /api/sessions/{{id}}/analyze  - Run analysis for an amount");
    tracing::info!("  POST /api/sessions/{{id}}/reset    - Reset a session");
    tracing::info!("  GET  /api/news                   - Collected articles (?symbol=)");
    tracing::info!("  GET  /api/news/status            - News collection status");
    tracing::info!("  GET  /api/news/summary           - Articles grouped by stock");
    tracing::info!("  GET  /api/news/search            - Keyword search (?q=&top_k=)");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
