//! Router

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers::{create_payment_session, health_check, stripe_webhook};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/payments/create-payment-session", post(create_payment_session))
        .route("/payments/webhook", post(stripe_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
