//! Payment Error Types

use thiserror::Error;
use validator::ValidationErrors;

use crate::signature::SignatureError;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Order payload failed validation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    /// Stripe API error
    #[error("Stripe error: {0}")]
    Stripe(String),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    WebhookSignature(#[from] SignatureError),

    /// Webhook payload parsing failed
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Message bus connect or publish failure
    #[error("Message bus error: {0}")]
    Bus(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PaymentError {
    /// Whether the caller sent something we refuse (as opposed to a failure on our side)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PaymentError::Validation(_)
                | PaymentError::WebhookSignature(_)
                | PaymentError::WebhookParse(_)
        )
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> &str {
        match self {
            PaymentError::Validation(_) => "The payment session request is invalid.",
            PaymentError::Stripe(_) => "Payment processing failed. Please try again.",
            PaymentError::WebhookSignature(_) | PaymentError::WebhookParse(_) => {
                "Webhook signature verification failed"
            }
            PaymentError::Config(_) => "Service configuration error.",
            PaymentError::Bus(_) => "An error occurred processing your request.",
        }
    }
}
