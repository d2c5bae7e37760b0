//! Nutrimatic - marketing site and dashboard for nutritionists
//!
//! Serves public pages, a gated dashboard backed by a hosted PostgREST-style
//! backend, prescription review with webhook notifications, and a file proxy
//! for in-browser PDF viewing.

pub mod backend;
pub mod config;
pub mod error;
pub mod gate;
pub mod hooks;
pub mod io;
pub mod model;
pub mod pages;
pub mod prescriptions;
pub mod proxy;
pub mod server;
pub mod state;
pub mod webhook;

pub use config::{load_config, Config};
pub use error::{NutrimaticError, Result};

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::backend::BackendClient;
use crate::io::{HttpClient, ReqwestHttpClient};
use crate::state::AppState;
use crate::webhook::WebhookDispatcher;

/// Assemble router state from configuration.
///
/// Missing or placeholder backend credentials leave the backend unset; the
/// routes that need it answer 503 instead of failing startup.
pub fn build_state(config: &Config, http: Arc<dyn HttpClient>) -> Result<AppState> {
    let backend = if config.backend.is_configured() {
        Some(BackendClient::new(&config.backend, Arc::clone(&http))?)
    } else {
        tracing::warn!(
            "Backend is not configured; set {} and {}. Dashboard and API routes will return 503",
            config::BACKEND_URL_ENV,
            config::BACKEND_ANON_KEY_ENV
        );
        None
    };

    let deliveries = state::new_delivery_log(config.webhooks.delivery_history_size);
    let webhooks = Arc::new(WebhookDispatcher::new(
        config.webhooks.urls.clone(),
        Arc::clone(&http),
        Arc::clone(&deliveries),
    ));

    Ok(AppState {
        backend,
        webhooks,
        deliveries,
        http,
        client_fixtures: config.clients.fixtures,
        secure_cookies: config.server.secure_cookies,
    })
}

/// Run the web service until ctrl-c
pub async fn run(config: Config) -> Result<()> {
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
    let state = build_state(&config, http)?;
    let cancel = CancellationToken::new();

    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for ctrl-c");
        tracing::info!("Shutdown signal received");
        cancel_for_signal.cancel();
    });

    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);
    tracing::debug!("Webhook destinations: {:?}", config.webhooks.urls);

    axum::serve(listener, server::build_router(state))
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
        })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
