//! HTTP surface: router, shared state and admin guard.

mod auth_sync;
mod catalog;
mod dashboard;
mod orders;
mod payments;
mod team;


use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;
use validator::Validate;

use crate::config::AppConfig;
use crate::dto::validation_message;
use crate::gateway::PaymentGateway;
use crate::repository::{OrderRepository, ProductRepository, UserRepository};
use crate::webhooks::WebhookVerifier;
use crate::StorefrontError;

#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<dyn OrderRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub users: Arc<dyn UserRepository>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub webhook: Option<WebhookVerifier>,
    pub admin_token: Option<String>,
    pub default_currency: String,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        orders: Arc<dyn OrderRepository>,
        products: Arc<dyn ProductRepository>,
        users: Arc<dyn UserRepository>,
        gateway: Arc<dyn PaymentGateway>,
        webhook: Option<WebhookVerifier>,
    ) -> Self {
        Self {
            orders,
            products,
            users,
            gateway,
            webhook,
            admin_token: config.admin_api_token.clone(),
            default_currency: config.default_currency.clone(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/update-order-status", patch(orders::update_status))
        .route("/orders", get(orders::admin_list))
        .route("/orders/:id", get(orders::admin_detail))
        .route("/products", get(catalog::admin_list).post(catalog::create_product))
        .route("/customers", get(catalog::customers))
        .route("/team", get(team::list).post(team::create))
        .route("/team/:id", patch(team::update).delete(team::revoke))
        .route("/stats", get(dashboard::stats))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "hypekart"})) }))
        .route("/api/razorpay/create-order", post(payments::create_order))
        .route("/api/razorpay/save-order", post(orders::save_order))
        .route("/api/user/orders", get(orders::user_orders))
        .route("/api/user/orders/:id/cancel", post(orders::cancel))
        .route("/api/user/orders/:id/return", post(orders::request_return))
        .route("/api/products", get(catalog::list))
        .route("/api/products/:id", get(catalog::get))
        .route("/api/webhooks/auth", post(auth_sync::receive))
        .nest("/api/admin", admin)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Unwraps a JSON body, turning extractor and validator failures into 400s.
fn validated<T: Validate>(payload: Result<Json<T>, JsonRejection>) -> Result<T, StorefrontError> {
    let Json(body) = payload.map_err(|e| StorefrontError::BadRequest(e.body_text()))?;
    body.validate().map_err(|e| StorefrontError::BadRequest(validation_message(&e)))?;
    Ok(body)
}

fn path_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, StorefrontError> {
    let Path(id) = path.map_err(|e| StorefrontError::BadRequest(e.body_text()))?;
    Ok(id)
}

fn query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, StorefrontError> {
    let Query(params) = query.map_err(|e| StorefrontError::BadRequest(e.body_text()))?;
    Ok(params)
}

async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Result<Response, StorefrontError> {
    let Some(expected) = state.admin_token.as_deref() else {
        tracing::warn!(path = %req.uri().path(), "admin route hit but no admin token is configured");
        return Err(StorefrontError::Unauthorized);
    };
    let provided = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default();
    if !constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
        tracing::warn!(path = %req.uri().path(), "rejected admin request");
        return Err(StorefrontError::Unauthorized);
    }
    Ok(next.run(req).await)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
