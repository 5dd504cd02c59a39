//! Checkout Sessions
//!
//! Turns an order into provider line items and opens a hosted checkout
//! session for it.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::Result;

/// Metadata key carrying the order id on the payment intent
pub const ORDER_ID_METADATA_KEY: &str = "orderId";

/// Request to open a payment session for an order
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PaymentSessionRequest {
    /// Order being paid; echoed back by the charge webhook
    #[validate(length(min = 1))]
    pub order_id: String,

    /// ISO 4217 code, e.g. `usd`
    #[validate(length(equal = 3))]
    pub currency: String,

    #[validate(length(min = 1), nested)]
    pub items: Vec<PaymentSessionItem>,
}

/// One order line
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PaymentSessionItem {
    #[validate(length(min = 1))]
    pub name: String,

    /// Unit price in major currency units; a JSON number, never a string
    #[serde(with = "rust_decimal::serde::float")]
    #[validate(custom(function = "validate_price"))]
    pub price: Decimal,

    #[validate(range(min = 1))]
    pub quantity: u64,
}

fn validate_price(price: &Decimal) -> std::result::Result<(), ValidationError> {
    if price.is_sign_negative() || price.is_zero() {
        return Err(ValidationError::new("price_not_positive"));
    }
    if to_minor_units(*price).is_none() {
        return Err(ValidationError::new("price_out_of_range"));
    }
    Ok(())
}

/// Convert a major-unit price to integer minor units (cents).
///
/// Rounds half away from zero, so `0.005` becomes `1` and `1.005` becomes `101`.
/// Returns `None` when the amount does not fit in an `i64`.
pub fn to_minor_units(price: Decimal) -> Option<i64> {
    price
        .checked_mul(Decimal::ONE_HUNDRED)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Provider-facing line item
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    /// Unit price in minor currency units
    pub unit_amount: i64,
    pub quantity: u64,
}

/// Redirect targets for the hosted checkout page
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedirectUrls {
    pub success_url: String,
    pub cancel_url: String,
}

/// Everything a provider needs to open a session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutDraft {
    pub order_id: String,
    /// Lower-cased currency code
    pub currency: String,
    pub line_items: Vec<LineItem>,
    pub success_url: String,
    pub cancel_url: String,
}

impl CheckoutDraft {
    /// Validate a request and convert it into provider line items
    pub fn build(request: &PaymentSessionRequest, urls: &RedirectUrls) -> Result<Self> {
        request.validate()?;

        let line_items = request
            .items
            .iter()
            .map(|item| {
                let unit_amount = to_minor_units(item.price).ok_or_else(|| {
                    let mut errors = ValidationErrors::new();
                    errors.add("price", ValidationError::new("price_out_of_range"));
                    errors
                })?;
                Ok(LineItem {
                    name: item.name.clone(),
                    unit_amount,
                    quantity: item.quantity,
                })
            })
            .collect::<std::result::Result<Vec<_>, ValidationErrors>>()?;

        Ok(Self {
            order_id: request.order_id.clone(),
            currency: request.currency.to_lowercase(),
            line_items,
            success_url: urls.success_url.clone(),
            cancel_url: urls.cancel_url.clone(),
        })
    }
}

/// Result of opening a checkout session, passed through from the provider
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionResult {
    pub success_url: String,
    pub cancel_url: String,
    /// Hosted checkout page to redirect the customer to
    pub url: String,
}

/// Checkout provider trait (Strategy pattern)
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    /// Open a hosted checkout session
    async fn create_session(&self, draft: &CheckoutDraft) -> Result<CheckoutSessionResult>;

    /// Provider name
    fn name(&self) -> &str;
}

/// Builds checkout sessions for orders
pub struct CheckoutService {
    provider: Arc<dyn CheckoutProvider>,
    urls: RedirectUrls,
}

impl CheckoutService {
    pub fn new(provider: Arc<dyn CheckoutProvider>, urls: RedirectUrls) -> Self {
        Self { provider, urls }
    }

    /// Validate the order, build line items and ask the provider for a session
    pub async fn create_payment_session(
        &self,
        request: PaymentSessionRequest,
    ) -> Result<CheckoutSessionResult> {
        let draft = CheckoutDraft::build(&request, &self.urls)?;

        tracing::info!(
            order_id = %draft.order_id,
            currency = %draft.currency,
            line_items = draft.line_items.len(),
            provider = self.provider.name(),
            "Creating checkout session"
        );

        self.provider.create_session(&draft).await
    }
}
