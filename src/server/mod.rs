//! HTTP surface: image cards, contribution data and the JSON widgets.

pub mod error;
pub mod handlers;

use crate::config::SiteConfig;
use crate::core::card::assets::HttpAssetFetcher;
use crate::core::card::render::CardRenderer;
use crate::core::card::CardService;
use crate::core::github::{ContributionService, GitHubScraper};
use crate::core::presence::{PresenceApi, PresenceService, PresenceStore};
use crate::core::wakatime::WakaTimeClient;
use crate::utils::error::Result;
use axum::routing::get;
use axum::Router;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SiteConfig>,
    pub presence: Arc<PresenceService>,
    pub cards: Arc<CardService>,
    pub contributions: Arc<ContributionService>,
    pub wakatime: Arc<WakaTimeClient>,
}

impl AppState {
    /// Wires every service from the site config. `store` is shared with the
    /// presence socket client when one runs.
    pub fn build(config: SiteConfig, store: PresenceStore) -> Result<Self> {
        let api = PresenceApi::new(&config.presence, &config.profile.discord_id)?;
        let presence = Arc::new(PresenceService::new(api, store));

        let asset_client = Client::builder()
            .timeout(Duration::from_secs(config.presence.request_timeout_seconds))
            .build()?;
        let cards = CardService::new(
            config.profile.clone(),
            config.presence.cdn_base.clone(),
            presence.clone(),
            Arc::new(HttpAssetFetcher::new(asset_client)),
            Arc::new(CardRenderer::new(config.card.render_height)),
            config.card.ttl(),
        );

        let contributions = ContributionService::new(
            GitHubScraper::new(&config.github)?,
            config.profile.github_username.clone(),
            config.github.cache_seconds,
        );
        let wakatime = WakaTimeClient::new(&config.wakatime)?;

        Ok(Self {
            config: Arc::new(config),
            presence,
            cards: Arc::new(cards),
            contributions: Arc::new(contributions),
            wakatime: Arc::new(wakatime),
        })
    }
}

pub fn router(state: AppState) -> Router {
    handlers::start_clock();
    Router::new()
        .route("/embed", get(handlers::embed))
        .route("/avatar", get(handlers::avatar))
        .route("/github", get(handlers::github))
        .route("/presence", get(handlers::presence))
        .route("/wakatime", get(handlers::wakatime))
        .route("/projects", get(handlers::projects))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the configured address and serves until Ctrl+C or SIGTERM.
pub async fn serve(state: AppState) -> Result<()> {
    let bind = state.config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(address = %bind, "Starting HTTP server");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
