//! Persistence boundary.
//!
//! Handlers talk to these traits; `postgres` backs production and `memory`
//! backs tests and database-less local runs.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{Order, OrderStatus, Product, UserProfile, UserRole, UserUpdate};
use crate::domain::dashboard::{SalesTotals, StockCounts};

pub use memory::{InMemoryOrders, InMemoryProducts, InMemoryUsers};
pub use postgres::{PgOrders, PgProducts, PgUsers};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("db error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("stored row is invalid: {0}")]
    Corrupt(String),
    #[error("duplicate: {0}")]
    Duplicate(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertOutcome {
    pub order_id: Uuid,
    /// False when an order for the same payment already existed.
    pub created: bool,
}

#[async_trait]
pub trait OrderRepository: Send + Sync + 'static {
    /// Inserts unless an order with the same payment id exists.
    async fn insert(&self, order: &Order) -> Result<InsertOutcome, RepositoryError>;
    async fn find(&self, id: Uuid) -> Result<Option<Order>, RepositoryError>;
    async fn list(&self, page: u32, per_page: u32) -> Result<(Vec<Order>, i64), RepositoryError>;
    /// Newest first.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Order>, RepositoryError>;
    /// Writes `target` only if the row is still at `expected`. Returns whether it did.
    async fn update_status(&self, id: Uuid, expected: OrderStatus, target: OrderStatus) -> Result<bool, RepositoryError>;
    /// `recent_sales` covers orders created at or after `since`.
    async fn sales_totals(&self, since: DateTime<Utc>) -> Result<SalesTotals, RepositoryError>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync + 'static {
    async fn list(&self, page: u32, per_page: u32, search: Option<&str>) -> Result<(Vec<Product>, i64), RepositoryError>;
    async fn get(&self, id: Uuid) -> Result<Option<Product>, RepositoryError>;
    async fn insert(&self, product: &Product) -> Result<(), RepositoryError>;
    async fn stock_counts(&self) -> Result<StockCounts, RepositoryError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    async fn insert(&self, profile: &UserProfile) -> Result<(), RepositoryError>;
    /// Returns whether a row matched.
    async fn update_by_auth_id(&self, auth_id: &str, update: &UserUpdate) -> Result<bool, RepositoryError>;
    async fn delete_by_auth_id(&self, auth_id: &str) -> Result<bool, RepositoryError>;
    async fn list_customers(&self, page: u32, per_page: u32) -> Result<(Vec<UserProfile>, i64), RepositoryError>;
    async fn count_customers(&self) -> Result<i64, RepositoryError>;
    /// Every non-customer account, newest first.
    async fn list_staff(&self, page: u32, per_page: u32) -> Result<(Vec<UserProfile>, i64), RepositoryError>;
    async fn find(&self, id: Uuid) -> Result<Option<UserProfile>, RepositoryError>;
    async fn update_staff(&self, id: Uuid, role: UserRole, active: bool) -> Result<bool, RepositoryError>;
    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError>;
}

pub(crate) fn offset(page: u32, per_page: u32) -> i64 {
    i64::from(page.max(1) - 1) * i64::from(per_page)
}
