//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::ShippingAddress;

#[derive(Clone, Debug)]
pub struct Order {
    id: Uuid,
    user_id: Option<String>,
    payment_id: String,
    gateway_order_id: Option<String>,
    total_amount: Decimal,
    items: Vec<OrderItem>,
    shipping_address: ShippingAddress,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    events: Vec<DomainEvent>,
}

/// Line captured at checkout time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub price: Decimal,
    pub quantity: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    Placed,
    Processing,
    Shipped,
    #[serde(rename = "Out for Delivery")]
    OutForDelivery,
    Delivered,
    Cancelled,
    #[serde(rename = "Return Requested")]
    ReturnRequested,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        Self::Placed, Self::Processing, Self::Shipped, Self::OutForDelivery,
        Self::Delivered, Self::Cancelled, Self::ReturnRequested,
    ];

    /// Statuses an admin may set. `Return Requested` only comes from the shopper.
    pub const ADMIN_SELECTABLE: [OrderStatus; 6] = [
        Self::Placed, Self::Processing, Self::Shipped, Self::OutForDelivery,
        Self::Delivered, Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Placed => "Placed",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::OutForDelivery => "Out for Delivery",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
            Self::ReturnRequested => "Return Requested",
        }
    }

    pub fn allowed_next(&self) -> &'static [OrderStatus] {
        match self {
            Self::Placed => &[Self::Processing, Self::Cancelled],
            Self::Processing => &[Self::Shipped, Self::Cancelled],
            Self::Shipped => &[Self::OutForDelivery, Self::Delivered],
            Self::OutForDelivery => &[Self::Delivered],
            Self::Delivered => &[Self::ReturnRequested],
            Self::Cancelled | Self::ReturnRequested => &[],
        }
    }

    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        *self == target || self.allowed_next().contains(&target)
    }

    pub fn is_admin_selectable(&self) -> bool { Self::ADMIN_SELECTABLE.contains(self) }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|st| st.as_str() == s).ok_or_else(|| OrderError::UnknownStatus(s.to_string()))
    }
}

/// Everything needed to rebuild an order from storage.
#[derive(Clone, Debug)]
pub struct OrderRecord {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub payment_id: String,
    pub gateway_order_id: Option<String>,
    pub total_amount: Decimal,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// A new order in `Placed`, created once the gateway confirms payment.
    pub fn place(
        payment_id: impl Into<String>,
        gateway_order_id: Option<String>,
        user_id: Option<String>,
        total_amount: Decimal,
        items: Vec<OrderItem>,
        shipping_address: ShippingAddress,
    ) -> Result<Self, OrderError> {
        let payment_id = payment_id.into();
        if payment_id.trim().is_empty() { return Err(OrderError::MissingPaymentId); }
        if items.is_empty() { return Err(OrderError::NoItems); }
        let mut order = Self {
            id: Uuid::now_v7(), user_id, payment_id, gateway_order_id, total_amount, items,
            shipping_address, status: OrderStatus::Placed, created_at: Utc::now(), events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Placed {
            order_id: order.id.to_string(), payment_id: order.payment_id.clone(), total: total_amount,
        }));
        Ok(order)
    }

    pub fn restore(r: OrderRecord) -> Self {
        Self {
            id: r.id, user_id: r.user_id, payment_id: r.payment_id, gateway_order_id: r.gateway_order_id,
            total_amount: r.total_amount, items: r.items, shipping_address: r.shipping_address,
            status: r.status, created_at: r.created_at, events: vec![],
        }
    }

    /// Snapshot without pending events.
    pub fn to_record(&self) -> OrderRecord {
        OrderRecord {
            id: self.id, user_id: self.user_id.clone(), payment_id: self.payment_id.clone(),
            gateway_order_id: self.gateway_order_id.clone(), total_amount: self.total_amount,
            items: self.items.clone(), shipping_address: self.shipping_address.clone(),
            status: self.status, created_at: self.created_at,
        }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn user_id(&self) -> Option<&str> { self.user_id.as_deref() }
    pub fn payment_id(&self) -> &str { &self.payment_id }
    pub fn gateway_order_id(&self) -> Option<&str> { self.gateway_order_id.as_deref() }
    pub fn total_amount(&self) -> Decimal { self.total_amount }
    pub fn items(&self) -> &[OrderItem] { &self.items }
    pub fn shipping_address(&self) -> &ShippingAddress { &self.shipping_address }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn is_owned_by(&self, user_id: &str) -> bool { self.user_id.as_deref() == Some(user_id) }

    /// Admin write. Returns whether the status actually changed.
    pub fn change_status(&mut self, target: OrderStatus) -> Result<bool, OrderError> {
        if !target.is_admin_selectable() { return Err(OrderError::NotAdminSelectable(target)); }
        self.transition(target)
    }

    /// Shopper cancel, only before processing starts.
    pub fn cancel_by_customer(&mut self) -> Result<(), OrderError> {
        if self.status != OrderStatus::Placed { return Err(OrderError::CannotCancel(self.status)); }
        self.transition(OrderStatus::Cancelled)?;
        self.raise_event(DomainEvent::Order(OrderEvent::Cancelled { order_id: self.id.to_string() }));
        Ok(())
    }

    pub fn request_return(&mut self) -> Result<(), OrderError> {
        if self.status != OrderStatus::Delivered { return Err(OrderError::CannotReturn(self.status)); }
        self.transition(OrderStatus::ReturnRequested)?;
        self.raise_event(DomainEvent::Order(OrderEvent::ReturnRequested { order_id: self.id.to_string() }));
        Ok(())
    }

    fn transition(&mut self, target: OrderStatus) -> Result<bool, OrderError> {
        let from = self.status;
        if from == target { return Ok(false); }
        if !from.can_transition_to(target) { return Err(OrderError::IllegalTransition { from, to: target }); }
        self.status = target;
        self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.id.to_string(), from, to: target }));
        Ok(true)
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("Order has no items")]
    NoItems,
    #[error("payment_id is required")]
    MissingPaymentId,
    #[error("Invalid status {0:?}. Must be one of: {list}", list = admin_status_list())]
    UnknownStatus(String),
    #[error("Status {0} cannot be set by an admin")]
    NotAdminSelectable(OrderStatus),
    #[error("Cannot move order from {from} to {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },
    #[error("Order cannot be cancelled once {0}")]
    CannotCancel(OrderStatus),
    #[error("Return can only be requested for delivered orders (order is {0})")]
    CannotReturn(OrderStatus),
}

pub fn admin_status_list() -> String {
    OrderStatus::ADMIN_SELECTABLE.iter().map(OrderStatus::as_str).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placed() -> Order {
        let item = OrderItem {
            product_id: "P1".into(), name: "Tee".into(), image: String::new(), size: Some("M".into()),
            color: None, price: Decimal::new(1299, 0), quantity: 2,
        };
        Order::place("pay_1", Some("order_1".into()), Some("user_1".into()), Decimal::new(3165, 0), vec![item], ShippingAddress::default()).unwrap()
    }

    #[test]
    fn test_order_workflow() {
        let mut order = placed();
        assert_eq!(order.status(), OrderStatus::Placed);
        assert!(matches!(order.take_events().as_slice(), [DomainEvent::Order(OrderEvent::Placed { .. })]));
        for next in [OrderStatus::Processing, OrderStatus::Shipped, OrderStatus::OutForDelivery, OrderStatus::Delivered] {
            assert_eq!(order.change_status(next), Ok(true));
        }
        assert_eq!(order.take_events().len(), 4);
        order.request_return().unwrap();
        assert_eq!(order.status(), OrderStatus::ReturnRequested);
    }

    #[test]
    fn test_status_strings() {
        assert_eq!("Out for Delivery".parse::<OrderStatus>(), Ok(OrderStatus::OutForDelivery));
        assert_eq!(OrderStatus::ReturnRequested.to_string(), "Return Requested");
        assert_eq!(serde_json::to_string(&OrderStatus::OutForDelivery).unwrap(), "\"Out for Delivery\"");
        let err = "Shipped123".parse::<OrderStatus>().unwrap_err();
        assert!(err.to_string().contains("Placed, Processing, Shipped, Out for Delivery, Delivered, Cancelled"));
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        let mut order = placed();
        assert_eq!(
            order.change_status(OrderStatus::Delivered),
            Err(OrderError::IllegalTransition { from: OrderStatus::Placed, to: OrderStatus::Delivered })
        );
        assert_eq!(order.status(), OrderStatus::Placed);
        assert_eq!(order.change_status(OrderStatus::ReturnRequested), Err(OrderError::NotAdminSelectable(OrderStatus::ReturnRequested)));
        order.change_status(OrderStatus::Cancelled).unwrap();
        assert!(order.change_status(OrderStatus::Processing).is_err());
    }

    #[test]
    fn test_same_status_is_noop() {
        let mut order = placed();
        order.take_events();
        assert_eq!(order.change_status(OrderStatus::Placed), Ok(false));
        assert!(order.take_events().is_empty());
    }

    #[test]
    fn test_customer_cancel_only_when_placed() {
        let mut order = placed();
        order.change_status(OrderStatus::Processing).unwrap();
        assert_eq!(order.cancel_by_customer(), Err(OrderError::CannotCancel(OrderStatus::Processing)));

        let mut order = placed();
        order.cancel_by_customer().unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert_eq!(order.request_return(), Err(OrderError::CannotReturn(OrderStatus::Cancelled)));
    }

    #[test]
    fn test_place_requires_payment_and_items() {
        assert_eq!(
            Order::place(" ", None, None, Decimal::ONE, vec![], ShippingAddress::default()).unwrap_err(),
            OrderError::MissingPaymentId
        );
        assert_eq!(
            Order::place("pay", None, None, Decimal::ONE, vec![], ShippingAddress::default()).unwrap_err(),
            OrderError::NoItems
        );
    }
}
