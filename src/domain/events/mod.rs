//! Domain events
use crate::domain::aggregates::OrderStatus;
use rust_decimal::Decimal;

#[derive(Clone, Debug, PartialEq)]
pub enum DomainEvent {
    Order(OrderEvent),
}

#[derive(Clone, Debug, PartialEq)]
pub enum OrderEvent {
    Placed { order_id: String, payment_id: String, total: Decimal },
    StatusChanged { order_id: String, from: OrderStatus, to: OrderStatus },
    Cancelled { order_id: String },
    ReturnRequested { order_id: String },
}

/// Emits drained events to the log once the write that produced them is durable.
pub fn record(events: Vec<DomainEvent>) {
    for event in events {
        match event {
            DomainEvent::Order(OrderEvent::Placed { order_id, payment_id, total }) => {
                tracing::info!(%order_id, %payment_id, %total, "order placed");
            }
            DomainEvent::Order(OrderEvent::StatusChanged { order_id, from, to }) => {
                tracing::info!(%order_id, %from, %to, "order status changed");
            }
            DomainEvent::Order(OrderEvent::Cancelled { order_id }) => {
                tracing::info!(%order_id, "order cancelled");
            }
            DomainEvent::Order(OrderEvent::ReturnRequested { order_id }) => {
                tracing::info!(%order_id, "order return requested");
            }
        }
    }
}
