use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use rust_decimal::Decimal;
use uuid::Uuid;
use validator::Validate;

use super::{path_id, query, validated, AppState};
use crate::domain::aggregates::{Order, OrderError, OrderStatus};
use crate::domain::events;
use crate::dto::{
    validation_message, CustomerOrderAction, ListParams, OrderView, PaginatedResponse, SaveOrderRequest,
    SaveOrderResponse, UpdateOrderStatusRequest, UpdateOrderStatusResponse, UserOrdersQuery, UserOrdersResponse,
};
use crate::StorefrontError;

/// Records a paid order. A repeat for the same payment returns the first order's id.
pub async fn save_order(
    State(s): State<AppState>,
    payload: Result<Json<SaveOrderRequest>, JsonRejection>,
) -> Result<Json<SaveOrderResponse>, StorefrontError> {
    let req = validated(payload)?;
    if req.amount <= Decimal::ZERO {
        return Err(StorefrontError::BadRequest("Invalid amount".into()));
    }
    let mut order = Order::place(
        req.payment_id,
        req.gateway_order_id,
        req.user_id,
        req.amount,
        req.items,
        req.shipping_address,
    )?;
    let outcome = s.orders.insert(&order).await?;
    if outcome.created {
        events::record(order.take_events());
    }
    Ok(Json(SaveOrderResponse { order_id: outcome.order_id, success: true }))
}

pub async fn user_orders(
    State(s): State<AppState>,
    params: Result<Query<UserOrdersQuery>, QueryRejection>,
) -> Result<Json<UserOrdersResponse>, StorefrontError> {
    let q = query(params)?;
    q.validate().map_err(|e| StorefrontError::BadRequest(validation_message(&e)))?;
    let orders = s.orders.list_for_user(&q.user_id).await?;
    Ok(Json(UserOrdersResponse { orders: orders.iter().map(OrderView::from).collect() }))
}

pub async fn cancel(
    State(s): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CustomerOrderAction>, JsonRejection>,
) -> Result<Json<OrderView>, StorefrontError> {
    let id = path_id(id)?;
    let req = validated(payload)?;
    customer_action(&s, id, &req.user_id, Order::cancel_by_customer).await
}

pub async fn request_return(
    State(s): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CustomerOrderAction>, JsonRejection>,
) -> Result<Json<OrderView>, StorefrontError> {
    let id = path_id(id)?;
    let req = validated(payload)?;
    customer_action(&s, id, &req.user_id, Order::request_return).await
}

async fn customer_action(
    s: &AppState,
    id: Uuid,
    user_id: &str,
    action: fn(&mut Order) -> Result<(), OrderError>,
) -> Result<Json<OrderView>, StorefrontError> {
    let mut order = load(s, id).await?;
    if !order.is_owned_by(user_id) {
        tracing::warn!(order_id = %id, %user_id, "customer action on another user's order");
        return Err(StorefrontError::Forbidden("Order does not belong to this user".into()));
    }
    let expected = order.status();
    action(&mut order)?;
    persist_status(s, &mut order, expected).await?;
    Ok(Json(OrderView::from(&order)))
}

/// Admin status change. The status string is checked before anything is read or written.
pub async fn update_status(
    State(s): State<AppState>,
    payload: Result<Json<UpdateOrderStatusRequest>, JsonRejection>,
) -> Result<Json<UpdateOrderStatusResponse>, StorefrontError> {
    let req = validated(payload)?;
    let target: OrderStatus = req.status.parse()?;
    if !target.is_admin_selectable() {
        return Err(OrderError::NotAdminSelectable(target).into());
    }
    let id = Uuid::parse_str(req.order_id.trim()).map_err(|_| StorefrontError::BadRequest("Invalid orderId".into()))?;

    let mut order = load(&s, id).await?;
    let expected = order.status();
    if order.change_status(target)? {
        persist_status(&s, &mut order, expected).await?;
    }
    Ok(Json(UpdateOrderStatusResponse { success: true, status: order.status() }))
}

pub async fn admin_list(
    State(s): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<PaginatedResponse<OrderView>>, StorefrontError> {
    let p = query(params)?;
    let page = p.page();
    let (orders, total) = s.orders.list(page, p.per_page()).await?;
    Ok(Json(PaginatedResponse { data: orders.iter().map(OrderView::from).collect(), total, page }))
}

pub async fn admin_detail(
    State(s): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<OrderView>, StorefrontError> {
    let order = load(&s, path_id(id)?).await?;
    Ok(Json(OrderView::from(&order)))
}

async fn load(s: &AppState, id: Uuid) -> Result<Order, StorefrontError> {
    s.orders.find(id).await?.ok_or_else(|| StorefrontError::NotFound("Order not found".into()))
}

/// Conditional write on the status the order was loaded with.
async fn persist_status(s: &AppState, order: &mut Order, expected: OrderStatus) -> Result<(), StorefrontError> {
    if !s.orders.update_status(order.id(), expected, order.status()).await? {
        tracing::warn!(order_id = %order.id(), %expected, "order status changed concurrently");
        return Err(StorefrontError::Conflict("Order was updated by someone else; reload and retry".into()));
    }
    events::record(order.take_events());
    Ok(())
}
