use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use rust_decimal::Decimal;

use super::AppState;
use crate::domain::value_objects::Money;
use crate::dto::{CreatePaymentIntentRequest, CreatePaymentIntentResponse};
use crate::gateway::PaymentIntentRequest;
use crate::StorefrontError;

/// Opens a gateway order for the checkout total.
pub async fn create_order(
    State(s): State<AppState>,
    payload: Result<Json<CreatePaymentIntentRequest>, JsonRejection>,
) -> Result<Json<CreatePaymentIntentResponse>, StorefrontError> {
    let Json(req) = payload.map_err(|e| StorefrontError::BadRequest(e.body_text()))?;
    if req.amount <= Decimal::ZERO {
        return Err(StorefrontError::BadRequest("Invalid amount".into()));
    }
    let currency = req.currency.as_deref().filter(|c| !c.trim().is_empty()).unwrap_or(&s.default_currency);
    let amount = Money::new(req.amount, currency)
        .to_minor_units()
        .ok_or_else(|| StorefrontError::BadRequest("Invalid amount".into()))?;
    let receipt = req
        .receipt
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| format!("rcpt_{}", chrono::Utc::now().timestamp_millis()));

    let intent = s
        .gateway
        .create_order(&PaymentIntentRequest { amount, currency: currency.to_string(), receipt })
        .await?;
    Ok(Json(CreatePaymentIntentResponse {
        order_id: intent.order_id,
        amount: intent.amount,
        currency: intent.currency,
        key_id: s.gateway.key_id().to_string(),
    }))
}
