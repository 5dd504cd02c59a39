//! HTTP Handlers

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;

use payments_core::{CheckoutSessionResult, PaymentError, PaymentSessionRequest, SIGNATURE_HEADER};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>, code: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
            details: None,
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Liveness check
pub async fn health_check() -> &'static str {
    "Payment Microservice is up and running!!"
}

/// Open a Stripe checkout session for an order
pub async fn create_payment_session(
    State(state): State<AppState>,
    payload: Result<Json<PaymentSessionRequest>, JsonRejection>,
) -> Result<Json<CheckoutSessionResult>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!(error = %rejection.body_text(), "Rejected payment session payload");
        let (status, Json(mut body)) = api_error(StatusCode::BAD_REQUEST, "Invalid payment session payload", "INVALID_PAYLOAD");
        body.details = Some(serde_json::Value::String(rejection.body_text()));
        (status, Json(body))
    })?;

    let order_id = request.order_id.clone();

    let session = state.checkout.create_payment_session(request).await.map_err(|e| match e {
        PaymentError::Validation(ref errors) => {
            tracing::warn!(order_id = %order_id, error = %e, "Payment session validation failed");
            let (status, Json(mut body)) = api_error(StatusCode::BAD_REQUEST, e.user_message(), "VALIDATION_ERROR");
            body.details = serde_json::to_value(errors).ok();
            (status, Json(body))
        }
        _ => {
            tracing::error!(order_id = %order_id, error = %e, "Checkout error");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e.user_message(), "CHECKOUT_ERROR")
        }
    })?;

    Ok(Json(session))
}

/// Stripe webhook handler
///
/// Takes the body as raw bytes: the signature covers them exactly as sent.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());

    match state.webhooks.process(&body, signature).await {
        Ok(_) => Ok(StatusCode::OK),
        Err(e) if e.is_client_error() => {
            tracing::warn!(error = %e, "Webhook signature verification failed");
            Err(api_error(StatusCode::BAD_REQUEST, e.user_message(), "INVALID_WEBHOOK"))
        }
        Err(e) => {
            tracing::error!(error = %e, "Webhook processing error");
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Webhook processing failed",
                "WEBHOOK_ERROR",
            ))
        }
    }
}
