//! Order placement workflow.
//!
//! Address → payment intent → embedded gateway checkout → order record.
//! The embedded checkout reports back over a [`PaymentBridge`] with exactly
//! one of three outcomes: success, dismissal or failure. Once the gateway has
//! captured a payment the flow never starts another one; if recording the
//! order fails it parks in [`CheckoutState::OrderNotRecorded`] and only
//! re-posts the same payment id.

mod bridge;
mod summary;

pub use bridge::{payment_channel, BridgeError, PaymentBridge, PaymentMessage, PaymentReceiver};
pub use summary::CheckoutSummary;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::client::ClientError;
use crate::domain::aggregates::{CartStore, OrderItem};
use crate::domain::value_objects::{AddressError, ShippingAddress};
use crate::dto::{CreatePaymentIntentRequest, CreatePaymentIntentResponse, SaveOrderRequest, SaveOrderResponse};

const STORE_NAME: &str = "HypeKart";

/// Backend calls the workflow depends on.
#[async_trait]
pub trait CheckoutBackend: Send + Sync {
    async fn create_payment_intent(&self, req: &CreatePaymentIntentRequest) -> Result<CreatePaymentIntentResponse, ClientError>;
    async fn save_order(&self, req: &SaveOrderRequest) -> Result<SaveOrderResponse, ClientError>;
}

/// What the embedded gateway checkout needs to open.
#[derive(Clone, Debug, PartialEq)]
pub struct PaymentSession {
    pub gateway_order_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub key_id: String,
    pub summary: CheckoutSummary,
    /// Cart lines as priced in `summary`; these are what the order records.
    pub items: Vec<OrderItem>,
    pub address: ShippingAddress,
    pub email: Option<String>,
}

impl PaymentSession {
    /// Options object passed to the gateway's checkout script.
    pub fn checkout_options(&self) -> serde_json::Value {
        serde_json::json!({
            "key": self.key_id,
            "amount": self.amount_minor,
            "currency": self.currency,
            "name": STORE_NAME,
            "description": "Order Payment",
            "order_id": self.gateway_order_id,
            "prefill": {
                "name": self.address.full_name,
                "email": self.email.as_deref().unwrap_or_default(),
                "contact": self.address.phone,
            },
            "theme": { "color": "#000000" },
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrderConfirmation {
    pub order_id: Uuid,
    pub payment_id: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CheckoutState {
    CollectingAddress,
    AwaitingPaymentIntent,
    RenderingPaymentUi(PaymentSession),
    PersistingOrder { payment_id: String },
    /// Payment captured, order row missing. Holds the exact request to re-post.
    OrderNotRecorded(SaveOrderRequest),
    Complete(OrderConfirmation),
}

impl CheckoutState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CollectingAddress => "collecting_address",
            Self::AwaitingPaymentIntent => "awaiting_payment_intent",
            Self::RenderingPaymentUi(_) => "rendering_payment_ui",
            Self::PersistingOrder { .. } => "persisting_order",
            Self::OrderNotRecorded(_) => "order_not_recorded",
            Self::Complete(_) => "complete",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Completed(OrderConfirmation),
    /// Shopper closed the payment sheet; back on the address step, nothing to show.
    Dismissed,
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Your cart is empty")]
    EmptyCart,
    #[error(transparent)]
    InvalidAddress(#[from] AddressError),
    #[error("Could not initiate payment: {0}")]
    PaymentIntent(#[source] ClientError),
    #[error("Payment failed: {0}")]
    PaymentFailed(String),
    #[error(
        "Payment {payment_id} succeeded but your order could not be recorded ({reason}). \
         Do not pay again; contact support with this payment id."
    )]
    OrderNotRecorded { payment_id: String, reason: String },
    #[error("Payment {payment_id} was already captured; contact support instead of paying again")]
    PaymentAlreadyCaptured { payment_id: String },
    #[error("Unexpected payment message while {0}")]
    UnexpectedMessage(&'static str),
    #[error("Payment window closed without a result")]
    ChannelClosed,
}

impl CheckoutError {
    /// The shopper has been charged; resubmitting payment must not be offered.
    pub fn payment_captured(&self) -> bool {
        matches!(self, Self::OrderNotRecorded { .. } | Self::PaymentAlreadyCaptured { .. })
    }
}

pub struct CheckoutFlow<B> {
    backend: B,
    user_id: Option<String>,
    email: Option<String>,
    state: CheckoutState,
}

impl<B: CheckoutBackend> CheckoutFlow<B> {
    pub fn new(backend: B, user_id: Option<String>) -> Self {
        Self { backend, user_id, email: None, state: CheckoutState::CollectingAddress }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn state(&self) -> &CheckoutState { &self.state }
    pub fn backend(&self) -> &B { &self.backend }

    fn set_state(&mut self, next: CheckoutState) {
        tracing::debug!(from = self.state.name(), to = next.name(), "checkout transition");
        self.state = next;
    }

    /// Validates the address and asks the backend for a payment intent.
    pub async fn proceed_to_payment(
        &mut self,
        cart: &CartStore,
        address: ShippingAddress,
    ) -> Result<PaymentSession, CheckoutError> {
        if let CheckoutState::OrderNotRecorded(pending) = &self.state {
            return Err(CheckoutError::PaymentAlreadyCaptured { payment_id: pending.payment_id.clone() });
        }
        self.set_state(CheckoutState::CollectingAddress);
        if cart.is_empty() { return Err(CheckoutError::EmptyCart); }
        address.validate()?;

        let summary = CheckoutSummary::for_cart(cart);
        let req = CreatePaymentIntentRequest {
            amount: summary.total.amount(),
            currency: Some(summary.total.currency().to_string()),
            receipt: None,
        };
        self.set_state(CheckoutState::AwaitingPaymentIntent);
        match self.backend.create_payment_intent(&req).await {
            Ok(intent) => {
                let session = PaymentSession {
                    gateway_order_id: intent.order_id,
                    amount_minor: intent.amount,
                    currency: intent.currency,
                    key_id: intent.key_id,
                    summary,
                    items: order_items(cart),
                    address,
                    email: self.email.clone(),
                };
                tracing::info!(gateway_order_id = %session.gateway_order_id, amount = session.amount_minor, "payment intent created");
                self.set_state(CheckoutState::RenderingPaymentUi(session.clone()));
                Ok(session)
            }
            Err(e) => {
                tracing::warn!(error = %e, "payment intent failed");
                self.set_state(CheckoutState::CollectingAddress);
                Err(CheckoutError::PaymentIntent(e))
            }
        }
    }

    /// Applies one outcome reported by the embedded checkout.
    pub async fn handle_payment_message(
        &mut self,
        cart: &mut CartStore,
        msg: PaymentMessage,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let session = match std::mem::replace(&mut self.state, CheckoutState::CollectingAddress) {
            CheckoutState::RenderingPaymentUi(session) => session,
            other => {
                let name = other.name();
                self.state = other;
                return Err(CheckoutError::UnexpectedMessage(name));
            }
        };

        match msg {
            PaymentMessage::Success { payment_id, order_id } => {
                tracing::info!(%payment_id, "payment succeeded");
                let req = SaveOrderRequest {
                    payment_id,
                    gateway_order_id: order_id.or(Some(session.gateway_order_id)),
                    amount: session.summary.total.amount(),
                    items: session.items,
                    shipping_address: session.address,
                    user_id: self.user_id.clone(),
                };
                self.record_order(cart, req).await.map(CheckoutOutcome::Completed)
            }
            PaymentMessage::Dismissed => {
                tracing::debug!("payment dismissed");
                Ok(CheckoutOutcome::Dismissed)
            }
            PaymentMessage::Failed { error } => {
                let reason = error.unwrap_or_else(|| "Your payment could not be processed.".to_string());
                tracing::warn!(%reason, "payment failed");
                Err(CheckoutError::PaymentFailed(reason))
            }
        }
    }

    /// Waits for the next message from the embedded checkout and applies it.
    pub async fn await_payment(
        &mut self,
        cart: &mut CartStore,
        receiver: &mut PaymentReceiver,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        match receiver.recv().await {
            Some(msg) => self.handle_payment_message(cart, msg).await,
            None => {
                if matches!(self.state, CheckoutState::RenderingPaymentUi(_)) {
                    self.set_state(CheckoutState::CollectingAddress);
                }
                Err(CheckoutError::ChannelClosed)
            }
        }
    }

    /// Re-posts the captured payment's order. The backend keys orders on the
    /// payment id, so a write that actually landed is not duplicated.
    pub async fn retry_order_record(&mut self, cart: &mut CartStore) -> Result<OrderConfirmation, CheckoutError> {
        let req = match std::mem::replace(&mut self.state, CheckoutState::CollectingAddress) {
            CheckoutState::OrderNotRecorded(req) => req,
            other => {
                let name = other.name();
                self.state = other;
                return Err(CheckoutError::UnexpectedMessage(name));
            }
        };
        self.record_order(cart, req).await
    }

    /// Leaves the flow, e.g. the shopper navigated away.
    pub fn reset(&mut self) {
        if let CheckoutState::OrderNotRecorded(req) = &self.state {
            tracing::warn!(payment_id = %req.payment_id, "abandoning checkout with a captured but unrecorded payment");
        }
        self.set_state(CheckoutState::CollectingAddress);
    }

    async fn record_order(&mut self, cart: &mut CartStore, req: SaveOrderRequest) -> Result<OrderConfirmation, CheckoutError> {
        self.set_state(CheckoutState::PersistingOrder { payment_id: req.payment_id.clone() });
        match self.backend.save_order(&req).await {
            Ok(saved) => {
                cart.clear();
                let confirmation = OrderConfirmation { order_id: saved.order_id, payment_id: req.payment_id };
                tracing::info!(order_id = %confirmation.order_id, payment_id = %confirmation.payment_id, "order recorded");
                self.set_state(CheckoutState::Complete(confirmation.clone()));
                Ok(confirmation)
            }
            Err(e) => {
                tracing::error!(payment_id = %req.payment_id, error = %e, "payment captured but order not recorded");
                let err = CheckoutError::OrderNotRecorded { payment_id: req.payment_id.clone(), reason: e.to_string() };
                self.set_state(CheckoutState::OrderNotRecorded(req));
                Err(err)
            }
        }
    }
}

fn order_items(cart: &CartStore) -> Vec<OrderItem> {
    cart.items()
        .iter()
        .map(|i| OrderItem {
            product_id: i.product_id.clone(),
            name: i.name.clone(),
            image: i.image.clone(),
            size: i.size.clone(),
            color: i.color.clone(),
            price: i.price,
            quantity: i.quantity.value(),
        })
        .collect()
}

#[cfg(test)]
mod tests;
