use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};

use super::AppState;
use crate::webhooks::{self, AuthEvent, WebhookError, ID_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::StorefrontError;

pub async fn receive(State(s): State<AppState>, headers: HeaderMap, body: Bytes) -> Result<Json<Value>, StorefrontError> {
    let Some(verifier) = s.webhook.as_ref() else {
        tracing::error!("auth webhook received but AUTH_WEBHOOK_SECRET is not set");
        return Err(WebhookError::InvalidSecret.into());
    };
    let id = header(&headers, ID_HEADER);
    let (timestamp, signatures) = (header(&headers, TIMESTAMP_HEADER), header(&headers, SIGNATURE_HEADER));

    if let Err(e) = verifier.verify(id, timestamp, signatures, &body, chrono::Utc::now()) {
        tracing::warn!(webhook_id = %id, error = %e, "webhook verification failed");
        return Err(e.into());
    }

    let event = AuthEvent::parse(&body)?;
    let outcome = webhooks::apply(s.users.as_ref(), event).await?;
    tracing::debug!(webhook_id = %id, ?outcome, "webhook processed");
    Ok(Json(json!({ "success": true })))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or_default()
}
