//! Payments Microservice
//!
//! Axum server exposing Stripe checkout session creation and the Stripe
//! webhook endpoint. Successful charges are republished on NATS as
//! `payment.succeeded`.

mod app;
mod config;
mod handlers;
mod state;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use payments_core::{CheckoutService, NatsBus, StripeClient, WebhookProcessor};

use crate::config::Config;
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

    let config = Config::from_env()?;
    tracing::debug!(?config, "Loaded configuration");

    // Message bus
    let bus = Arc::new(NatsBus::connect(&config.nats_servers).await?);
    tracing::info!(servers = ?config.nats_servers, "✓ Connected to NATS");

    // Payments
    let stripe = Arc::new(StripeClient::new(&config.stripe_secret));
    let checkout = CheckoutService::new(stripe, config.redirect_urls());
    let webhooks = WebhookProcessor::new(config.stripe_endpoint_secret.clone(), bus)
        .with_tolerance(config.webhook_tolerance);

    let state = AppState {
        checkout: Arc::new(checkout),
        webhooks: Arc::new(webhooks),
    };

    let app = app::router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;

    tracing::info!("Payments Microservice running on port {}", config.port);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /                                 - Health check");
    tracing::info!("  POST /payments/create-payment-session  - Create Stripe checkout");
    tracing::info!("  POST /payments/webhook                 - Stripe webhook");

    axum::serve(listener, app).await?;

    Ok(())
}
