//! Stripe Webhook Handling
//!
//! Verifies deliveries against the endpoint secret and republishes successful
//! charges onto the message bus.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bus::MessageBus;
use crate::checkout::ORDER_ID_METADATA_KEY;
use crate::error::{PaymentError, Result};
use crate::signature::{self, DEFAULT_TOLERANCE};

/// Topic for successful payments
pub const PAYMENT_SUCCEEDED_TOPIC: &str = "payment.succeeded";

/// Stripe event type we act on
pub const CHARGE_SUCCEEDED: &str = "charge.succeeded";

/// Normalized payload published for a successful charge
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSucceeded {
    pub stripe_payment_id: String,
    pub order_id: Option<String>,
    pub receipt_url: Option<String>,
}

/// Verified webhook event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookEvent {
    /// A charge went through
    ChargeSucceeded {
        event_id: String,
        payment: PaymentSucceeded,
    },

    /// Anything else; accepted but not acted on
    Other { event_id: String, event_type: String },
}

impl WebhookEvent {
    /// Parse a verified payload
    pub fn from_slice(payload: &[u8]) -> Result<Self> {
        let raw: RawStripeEvent =
            serde_json::from_slice(payload).map_err(|e| PaymentError::WebhookParse(e.to_string()))?;

        if raw.event_type != CHARGE_SUCCEEDED {
            return Ok(WebhookEvent::Other {
                event_id: raw.id,
                event_type: raw.event_type,
            });
        }

        let charge: RawCharge = serde_json::from_value(raw.data.object)
            .map_err(|e| PaymentError::WebhookParse(format!("Invalid charge data: {e}")))?;

        Ok(WebhookEvent::ChargeSucceeded {
            event_id: raw.id,
            payment: PaymentSucceeded {
                stripe_payment_id: charge.id,
                order_id: charge.metadata.get(ORDER_ID_METADATA_KEY).cloned(),
                receipt_url: charge.receipt_url,
            },
        })
    }

    pub fn event_type(&self) -> &str {
        match self {
            WebhookEvent::ChargeSucceeded { .. } => CHARGE_SUCCEEDED,
            WebhookEvent::Other { event_type, .. } => event_type,
        }
    }
}

/// What happened to a verified event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Payment event handed to the bus
    Published(PaymentSucceeded),

    /// Event type we don't handle
    Ignored { event_type: String },
}

/// Webhook processor
pub struct WebhookProcessor {
    endpoint_secret: String,
    tolerance: Duration,
    bus: Arc<dyn MessageBus>,
}

impl WebhookProcessor {
    pub fn new(endpoint_secret: impl Into<String>, bus: Arc<dyn MessageBus>) -> Self {
        Self {
            endpoint_secret: endpoint_secret.into(),
            tolerance: DEFAULT_TOLERANCE,
            bus,
        }
    }

    /// Override the replay window (zero disables the timestamp check)
    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Verify webhook signature over the raw body and parse the event
    pub fn verify(&self, payload: &[u8], signature: Option<&str>) -> Result<WebhookEvent> {
        signature::verify(payload, signature, &self.endpoint_secret, self.tolerance)?;
        WebhookEvent::from_slice(payload)
    }

    /// Same as [`verify`](Self::verify) with an explicit clock
    pub fn verify_at(&self, payload: &[u8], signature: Option<&str>, now: i64) -> Result<WebhookEvent> {
        signature::verify_at(payload, signature, &self.endpoint_secret, self.tolerance, now)?;
        WebhookEvent::from_slice(payload)
    }

    /// Dispatch a verified event
    pub async fn handle(&self, event: WebhookEvent) -> WebhookOutcome {
        match event {
            WebhookEvent::ChargeSucceeded { event_id, payment } => {
                if payment.order_id.is_none() {
                    tracing::warn!(
                        event_id = %event_id,
                        charge_id = %payment.stripe_payment_id,
                        "Charge has no orderId metadata"
                    );
                }

                match serde_json::to_value(&payment) {
                    Ok(body) => match self.bus.publish(PAYMENT_SUCCEEDED_TOPIC, body).await {
                        Ok(()) => tracing::info!(
                            event_id = %event_id,
                            charge_id = %payment.stripe_payment_id,
                            order_id = ?payment.order_id,
                            topic = PAYMENT_SUCCEEDED_TOPIC,
                            "Published payment event"
                        ),
                        Err(e) => tracing::error!(
                            event_id = %event_id,
                            topic = PAYMENT_SUCCEEDED_TOPIC,
                            bus = self.bus.name(),
                            error = %e,
                            "Failed to publish payment event"
                        ),
                    },
                    Err(e) => tracing::error!(event_id = %event_id, error = %e, "Failed to encode payment event"),
                }

                WebhookOutcome::Published(payment)
            }

            WebhookEvent::Other { event_id, event_type } => {
                tracing::info!(event_id = %event_id, event_type = %event_type, "Event not handled");
                WebhookOutcome::Ignored { event_type }
            }
        }
    }

    /// Verify, parse and dispatch one delivery
    pub async fn process(&self, payload: &[u8], signature: Option<&str>) -> Result<WebhookOutcome> {
        let event = self.verify(payload, signature)?;
        tracing::debug!(event_type = %event.event_type(), "Processing Stripe webhook");
        Ok(self.handle(event).await)
    }
}

// Raw Stripe event for parsing
#[derive(Debug, Deserialize)]
struct RawStripeEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RawCharge {
    id: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
    receipt_url: Option<String>,
}
