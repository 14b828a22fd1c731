//! Admin dashboard figures.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::domain::aggregates::OrderStatus;

/// Products at or below this many units, but not zero, count as low stock.
pub const LOW_STOCK_THRESHOLD: i32 = 5;
/// Window for "recent sales".
pub const RECENT_SALES_DAYS: i64 = 30;

/// Revenue excludes cancelled orders.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SalesTotals {
    pub total_revenue: Decimal,
    pub recent_sales: Decimal,
    pub active_orders: i64,
}

impl SalesTotals {
    pub fn add(&mut self, amount: Decimal, status: OrderStatus, created_at: DateTime<Utc>, since: DateTime<Utc>) {
        if matches!(status, OrderStatus::Processing | OrderStatus::Shipped) {
            self.active_orders += 1;
        }
        if status == OrderStatus::Cancelled {
            return;
        }
        self.total_revenue += amount;
        if created_at >= since {
            self.recent_sales += amount;
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StockCounts {
    pub low_stock: i64,
    pub out_of_stock: i64,
}

impl StockCounts {
    pub fn add(&mut self, stock: i32) {
        if stock <= 0 {
            self.out_of_stock += 1;
        } else if stock <= LOW_STOCK_THRESHOLD {
            self.low_stock += 1;
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_revenue: Decimal,
    pub recent_sales: Decimal,
    /// Recent sales as a percentage of all revenue, one decimal place.
    pub growth_rate: Decimal,
    pub active_orders: i64,
    pub customers: i64,
    pub low_stock: i64,
    pub out_of_stock: i64,
}

impl DashboardStats {
    pub fn new(sales: SalesTotals, stock: StockCounts, customers: i64) -> Self {
        let growth_rate = if sales.total_revenue > Decimal::ZERO {
            (sales.recent_sales * Decimal::ONE_HUNDRED / sales.total_revenue)
                .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
        } else {
            Decimal::ZERO
        };
        Self {
            total_revenue: sales.total_revenue,
            recent_sales: sales.recent_sales,
            growth_rate,
            active_orders: sales.active_orders,
            customers,
            low_stock: stock.low_stock,
            out_of_stock: stock.out_of_stock,
        }
    }
}

/// Start of the recent-sales window.
pub fn recent_since(now: DateTime<Utc>) -> DateTime<Utc> {
    now - chrono::Duration::days(RECENT_SALES_DAYS)
}
