//! Payment gateway boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const RAZORPAY_API_BASE: &str = "https://api.razorpay.com";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentIntentRequest {
    /// Smallest currency unit (paise for INR).
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentIntent {
    #[serde(rename = "id")]
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("gateway rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("gateway is not configured")]
    NotConfigured,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, req: &PaymentIntentRequest) -> Result<PaymentIntent, GatewayError>;

    /// Public key the client checkout is opened with.
    fn key_id(&self) -> &str;
}

#[derive(Clone)]
pub struct RazorpayGateway {
    http: reqwest::Client,
    api_base: String,
    key_id: String,
    key_secret: String,
}

impl std::fmt::Debug for RazorpayGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayGateway")
            .field("api_base", &self.api_base)
            .field("key_id", &self.key_id)
            .field("key_secret", &"[REDACTED]")
            .finish()
    }
}

#[derive(Deserialize)]
struct RazorpayErrorBody {
    error: RazorpayErrorDetail,
}

#[derive(Deserialize)]
struct RazorpayErrorDetail {
    #[serde(default)]
    description: Option<String>,
}

impl RazorpayGateway {
    pub fn new(
        api_base: impl Into<String>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_order(&self, req: &PaymentIntentRequest) -> Result<PaymentIntent, GatewayError> {
        if self.key_id.is_empty() || self.key_secret.is_empty() {
            return Err(GatewayError::NotConfigured);
        }
        let url = format!("{}/v1/orders", self.api_base);
        let res = self
            .http
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(req)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let message = res
                .json::<RazorpayErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error.description)
                .unwrap_or_else(|| status.to_string());
            tracing::warn!(status = status.as_u16(), %message, "gateway rejected order");
            return Err(GatewayError::Rejected { status: status.as_u16(), message });
        }

        let intent: PaymentIntent = res.json().await?;
        tracing::info!(order_id = %intent.order_id, amount = intent.amount, currency = %intent.currency, "gateway order created");
        Ok(intent)
    }

    fn key_id(&self) -> &str { &self.key_id }
}
