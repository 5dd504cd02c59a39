//! Stripe Checkout Integration
//!
//! Hosted checkout in one-off `payment` mode: the customer is redirected to
//! Stripe and back to the configured success/cancel URLs.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use stripe::{
    CheckoutSession as StripeCheckoutSession, CheckoutSessionMode, Client,
    CreateCheckoutSession, CreateCheckoutSessionLineItems,
    CreateCheckoutSessionLineItemsPriceData,
    CreateCheckoutSessionLineItemsPriceDataProductData,
    CreateCheckoutSessionPaymentIntentData, Currency,
};

use crate::checkout::{CheckoutDraft, CheckoutProvider, CheckoutSessionResult, ORDER_ID_METADATA_KEY};
use crate::error::{PaymentError, Result};

/// Stripe client wrapper
pub struct StripeClient {
    client: Client,
}

impl StripeClient {
    /// Create a new Stripe client
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: Client::new(secret_key),
        }
    }
}

/// Build the Stripe request for a draft
fn session_params(draft: &CheckoutDraft, currency: Currency) -> CreateCheckoutSession<'_> {
    let mut params = CreateCheckoutSession::new();
    params.mode = Some(CheckoutSessionMode::Payment);
    params.success_url = Some(draft.success_url.as_str());
    params.cancel_url = Some(draft.cancel_url.as_str());

    // The charge.succeeded webhook reads the order id back from here
    let mut metadata = HashMap::new();
    metadata.insert(ORDER_ID_METADATA_KEY.to_string(), draft.order_id.clone());
    params.payment_intent_data = Some(CreateCheckoutSessionPaymentIntentData {
        metadata: Some(metadata),
        ..Default::default()
    });

    params.line_items = Some(
        draft
            .line_items
            .iter()
            .map(|item| CreateCheckoutSessionLineItems {
                quantity: Some(item.quantity),
                price_data: Some(CreateCheckoutSessionLineItemsPriceData {
                    currency: currency.clone(),
                    unit_amount: Some(item.unit_amount),
                    product_data: Some(CreateCheckoutSessionLineItemsPriceDataProductData {
                        name: item.name.clone(),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            })
            .collect(),
    );

    params
}

#[async_trait]
impl CheckoutProvider for StripeClient {
    async fn create_session(&self, draft: &CheckoutDraft) -> Result<CheckoutSessionResult> {
        let currency = Currency::from_str(&draft.currency)
            .map_err(|_| PaymentError::Stripe(format!("Unsupported currency: {}", draft.currency)))?;

        let params = session_params(draft, currency);

        let session = StripeCheckoutSession::create(&self.client, params)
            .await
            .map_err(|e| PaymentError::Stripe(e.to_string()))?;

        tracing::debug!(session_id = %session.id, order_id = %draft.order_id, "Stripe checkout session created");

        let url = session
            .url
            .ok_or_else(|| PaymentError::Stripe("No checkout URL returned".into()))?;

        // Redirect URLs are nullable on sessions that use embedded UI
        let success_url: Option<String> = session.success_url.into();
        let cancel_url: Option<String> = session.cancel_url.into();

        Ok(CheckoutSessionResult {
            success_url: success_url.unwrap_or_else(|| draft.success_url.clone()),
            cancel_url: cancel_url.unwrap_or_else(|| draft.cancel_url.clone()),
            url,
        })
    }

    fn name(&self) -> &str {
        "stripe"
    }
}
