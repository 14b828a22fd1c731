//! JSON contracts shared by the backend routes and the shopping client.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::domain::aggregates::{Order, OrderItem, OrderStatus};
use crate::domain::value_objects::ShippingAddress;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentIntentRequest {
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentResponse {
    pub order_id: String,
    /// Minor units.
    pub amount: i64,
    pub currency: String,
    pub key_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SaveOrderRequest {
    #[serde(default, alias = "razorpay_payment_id")]
    #[validate(length(min = 1, message = "payment_id is required"))]
    pub payment_id: String,
    #[serde(default, alias = "razorpay_order_id")]
    pub gateway_order_id: Option<String>,
    pub amount: Decimal,
    #[validate(length(min = 1, message = "items must not be empty"))]
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    #[serde(default, alias = "user_clerk_id")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOrderResponse {
    pub order_id: Uuid,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "orderId is required"))]
    pub order_id: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "status is required"))]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateOrderStatusResponse {
    pub success: bool,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserOrdersQuery {
    #[serde(default, alias = "clerk_user_id")]
    #[validate(length(min = 1, message = "user_id is required"))]
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CustomerOrderAction {
    #[serde(default)]
    #[validate(length(min = 1, message = "user_id is required"))]
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderView {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub order_items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_id: String,
    pub gateway_order_id: Option<String>,
}

impl From<&Order> for OrderView {
    fn from(o: &Order) -> Self {
        Self {
            id: o.id(),
            user_id: o.user_id().map(str::to_string),
            total_amount: o.total_amount(),
            status: o.status(),
            created_at: o.created_at(),
            order_items: o.items().to_vec(),
            shipping_address: o.shipping_address().clone(),
            payment_id: o.payment_id().to_string(),
            gateway_order_id: o.gateway_order_id().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserOrdersResponse {
    pub orders: Vec<OrderView>,
}

/// Admin edit of a staff account. Omitted fields keep their value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStaffRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Shown as Active / Pending Verification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
}

impl ListParams {
    pub fn page(&self) -> u32 { self.page.unwrap_or(1).max(1) }
    pub fn per_page(&self) -> u32 { self.per_page.unwrap_or(20).clamp(1, 100) }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Joins validator messages in field order, for a stable client message.
pub fn validation_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by_key(|(field, _)| *field);
    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(m) => m.to_string(),
                None => format!("{field} is invalid"),
            })
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_order_accepts_gateway_field_names() {
        let req: SaveOrderRequest = serde_json::from_value(serde_json::json!({
            "razorpay_payment_id": "pay_1",
            "razorpay_order_id": "order_1",
            "amount": 3165,
            "items": [{"product_id": "P1", "name": "Tee", "image": "", "size": "M", "color": null, "price": 1299, "quantity": 2}],
            "shipping_address": {"full_name": "A", "phone": "9876543210", "address": "x", "city": "y", "state": "z", "pincode": "400001"},
            "user_clerk_id": "user_1"
        }))
        .unwrap();
        assert_eq!(req.payment_id, "pay_1");
        assert_eq!(req.gateway_order_id.as_deref(), Some("order_1"));
        assert_eq!(req.user_id.as_deref(), Some("user_1"));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_validation_message_is_stable() {
        let req = UpdateOrderStatusRequest { order_id: String::new(), status: String::new() };
        let errors = req.validate().unwrap_err();
        assert_eq!(validation_message(&errors), "orderId is required; status is required");
    }

    #[test]
    fn test_payment_intent_response_is_camel_case() {
        let body = serde_json::to_value(CreatePaymentIntentResponse {
            order_id: "order_1".into(), amount: 100, currency: "INR".into(), key_id: "rzp_test".into(),
        })
        .unwrap();
        assert_eq!(body["orderId"], "order_1");
        assert_eq!(body["keyId"], "rzp_test");
    }
}
