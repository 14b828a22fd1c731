//! HTTP client the shopping app uses to reach the backend API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::checkout::CheckoutBackend;
use crate::domain::aggregates::OrderStatus;
use crate::dto::{
    CreatePaymentIntentRequest, CreatePaymentIntentResponse, CustomerOrderAction, ErrorBody, OrderView,
    SaveOrderRequest, SaveOrderResponse, UpdateOrderStatusRequest, UpdateOrderStatusResponse,
    UserOrdersResponse,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },
    #[error("expected JSON from {url}, got {content_type:?}")]
    UnexpectedContentType { url: String, content_type: String },
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    admin_token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, base_url: base_url.into().trim_end_matches('/').to_string(), admin_token: None })
    }

    pub fn with_admin_token(mut self, token: impl Into<String>) -> Self {
        self.admin_token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String { format!("{}{}", self.base_url, path) }

    pub async fn fetch_user_orders(&self, user_id: &str) -> Result<Vec<OrderView>, ClientError> {
        let url = self.url("/user/orders");
        let res = self.http.get(&url).query(&[("user_id", user_id)]).send().await?;
        let body: UserOrdersResponse = decode(&url, res).await?;
        Ok(body.orders)
    }

    pub async fn cancel_order(&self, order_id: Uuid, user_id: &str) -> Result<OrderView, ClientError> {
        let body = CustomerOrderAction { user_id: user_id.to_string() };
        self.post_json(&format!("/user/orders/{order_id}/cancel"), &body).await
    }

    pub async fn request_return(&self, order_id: Uuid, user_id: &str) -> Result<OrderView, ClientError> {
        let body = CustomerOrderAction { user_id: user_id.to_string() };
        self.post_json(&format!("/user/orders/{order_id}/return"), &body).await
    }

    pub async fn update_order_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<UpdateOrderStatusResponse, ClientError> {
        let url = self.url("/admin/update-order-status");
        let body = UpdateOrderStatusRequest { order_id: order_id.to_string(), status: status.to_string() };
        let mut req = self.http.patch(&url).json(&body);
        if let Some(token) = &self.admin_token {
            req = req.bearer_auth(token);
        }
        decode(&url, req.send().await?).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ClientError> {
        let url = self.url(path);
        let res = self.http.post(&url).json(body).send().await?;
        decode(&url, res).await
    }
}

// Error pages from proxies come back as HTML; reject anything that is not JSON.
async fn decode<T: DeserializeOwned>(url: &str, res: Response) -> Result<T, ClientError> {
    let status = res.status();
    let content_type = res
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !content_type.contains("application/json") {
        tracing::warn!(%url, %status, %content_type, "non-JSON response from API");
        return Err(ClientError::UnexpectedContentType { url: url.to_string(), content_type });
    }
    if !status.is_success() {
        let message = res
            .json::<ErrorBody>()
            .await
            .map(|b| b.error)
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("request failed").to_string());
        return Err(ClientError::Api { status: status.as_u16(), message });
    }
    Ok(res.json().await?)
}

#[async_trait]
impl CheckoutBackend for ApiClient {
    async fn create_payment_intent(&self, req: &CreatePaymentIntentRequest) -> Result<CreatePaymentIntentResponse, ClientError> {
        self.post_json("/razorpay/create-order", req).await
    }

    async fn save_order(&self, req: &SaveOrderRequest) -> Result<SaveOrderResponse, ClientError> {
        self.post_json("/razorpay/save-order", req).await
    }
}
