//! # payments-core
//!
//! Checkout sessions and payment notifications for the payments service.
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────┐  create session  ┌─────────────────┐  redirect  ┌─────────────┐
//! │   Orders    │─────────────────▶│  Stripe Hosted  │───────────▶│  success /  │
//! │  (client)   │                  │  Checkout Page  │            │  cancel URL │
//! └─────────────┘                  └────────┬────────┘            └─────────────┘
//!                                           │ charge.succeeded (signed webhook)
//!                                           ▼
//!                                  ┌─────────────────┐  payment.succeeded  ┌──────┐
//!                                  │ WebhookProcessor│────────────────────▶│ NATS │
//!                                  └─────────────────┘                     └──────┘
//! ```
//!
//! The order id travels as payment intent metadata, so the charge that Stripe
//! reports later can be tied back to the order that created the session.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use payments_core::{CheckoutService, NatsBus, RedirectUrls, StripeClient, WebhookProcessor};
//!
//! let checkout = CheckoutService::new(
//!     Arc::new(StripeClient::new("sk_test_xxx")),
//!     RedirectUrls {
//!         success_url: "https://shop.example.com/payments/success".into(),
//!         cancel_url: "https://shop.example.com/payments/cancel".into(),
//!     },
//! );
//! let session = checkout.create_payment_session(request).await?;
//! // Redirect user to: session.url
//!
//! let bus = Arc::new(NatsBus::connect(&["nats://localhost:4222".into()]).await?);
//! let webhooks = WebhookProcessor::new("whsec_xxx", bus);
//! webhooks.process(&raw_body, signature_header).await?;
//! ```

mod bus;
mod checkout;
mod error;
pub mod signature;
mod stripe_client;
mod webhook;

pub use bus::{event_envelope, MemoryBus, MessageBus, NatsBus, PublishedMessage};
pub use checkout::{
    to_minor_units, CheckoutDraft, CheckoutProvider, CheckoutService, CheckoutSessionResult,
    LineItem, PaymentSessionItem, PaymentSessionRequest, RedirectUrls, ORDER_ID_METADATA_KEY,
};
pub use error::{PaymentError, Result};
pub use signature::{SignatureError, DEFAULT_TOLERANCE, SIGNATURE_HEADER};
pub use stripe_client::StripeClient;
pub use webhook::{
    PaymentSucceeded, WebhookEvent, WebhookOutcome, WebhookProcessor, CHARGE_SUCCEEDED,
    PAYMENT_SUCCEEDED_TOPIC,
};
