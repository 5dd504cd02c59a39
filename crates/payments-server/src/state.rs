//! Application State

use std::sync::Arc;

use payments_core::{CheckoutService, WebhookProcessor};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Checkout session builder
    pub checkout: Arc<CheckoutService>,

    /// Stripe webhook verification and event publishing
    pub webhooks: Arc<WebhookProcessor>,
}
