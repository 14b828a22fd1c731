//! HypeKart storefront
//!
//! Streetwear shop backend and shopping-client core.
//!
//! ## Features
//! - Variant-aware cart and persisted wishlist
//! - Checkout workflow over a hosted payment sheet
//! - Order recording and status lifecycle
//! - Auth-provider user sync via signed webhooks
//! - Admin catalog, order, customer, team and dashboard endpoints

pub mod api;
pub mod checkout;
pub mod client;
pub mod config;
pub mod domain;
pub mod dto;
pub mod gateway;
pub mod repository;
pub mod storage;
pub mod webhooks;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::domain::aggregates::{OrderError, ProductError, UserError};
use crate::domain::value_objects::AddressError;
use crate::dto::ErrorBody;
use crate::gateway::GatewayError;
use crate::repository::RepositoryError;
use crate::webhooks::WebhookError;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Product(#[from] ProductError),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    User(#[from] UserError),

    #[error("Payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Storage error: {0}")]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Webhook(#[from] WebhookError),
}

impl StorefrontError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Product(_) | Self::Address(_) | Self::User(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Order(e) => match e {
                OrderError::IllegalTransition { .. } | OrderError::CannotCancel(_) | OrderError::CannotReturn(_) => {
                    StatusCode::CONFLICT
                }
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Gateway(GatewayError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Gateway(_) => StatusCode::BAD_GATEWAY,
            Self::Repository(RepositoryError::Duplicate(_)) => StatusCode::CONFLICT,
            Self::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Webhook(WebhookError::InvalidSecret) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Webhook(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for StorefrontError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Server-side details stay in the log.
        let message = if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "request failed");
            match self {
                Self::Gateway(_) => "Payment gateway unavailable".to_string(),
                _ => "Internal server error".to_string(),
            }
        } else {
            self.to_string()
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
