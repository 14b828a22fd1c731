use axum::extract::State;
use axum::Json;

use super::AppState;
use crate::domain::dashboard::{recent_since, DashboardStats};
use crate::StorefrontError;

pub async fn stats(State(s): State<AppState>) -> Result<Json<DashboardStats>, StorefrontError> {
    let sales = s.orders.sales_totals(recent_since(chrono::Utc::now())).await?;
    let stock = s.products.stock_counts().await?;
    let customers = s.users.count_customers().await?;
    Ok(Json(DashboardStats::new(sales, stock, customers)))
}
