//! Postgres-backed repositories.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::{offset, InsertOutcome, OrderRepository, ProductRepository, RepositoryError, UserRepository};
use crate::domain::aggregates::{Order, OrderItem, OrderRecord, OrderStatus, Product, UserProfile, UserRole, UserUpdate};
use crate::domain::dashboard::{SalesTotals, StockCounts, LOW_STOCK_THRESHOLD};
use crate::domain::value_objects::ShippingAddress;

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Option<String>,
    payment_id: String,
    gateway_order_id: Option<String>,
    total_amount: Decimal,
    order_items: Json<Vec<OrderItem>>,
    shipping_address: Json<ShippingAddress>,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;
    fn try_from(r: OrderRow) -> Result<Self, Self::Error> {
        let status = r.status.parse::<OrderStatus>().map_err(|e| RepositoryError::Corrupt(format!("order {}: {e}", r.id)))?;
        Ok(Order::restore(OrderRecord {
            id: r.id,
            user_id: r.user_id,
            payment_id: r.payment_id,
            gateway_order_id: r.gateway_order_id,
            total_amount: r.total_amount,
            items: r.order_items.0,
            shipping_address: r.shipping_address.0,
            status,
            created_at: r.created_at,
        }))
    }
}

const ORDER_COLUMNS: &str =
    "id, user_id, payment_id, gateway_order_id, total_amount, order_items, shipping_address, status, created_at";

#[derive(Clone)]
pub struct PgOrders { pool: PgPool }

impl PgOrders {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl OrderRepository for PgOrders {
    async fn insert(&self, order: &Order) -> Result<InsertOutcome, RepositoryError> {
        let inserted: Option<(Uuid,)> = sqlx::query_as(
            "INSERT INTO orders (id, user_id, payment_id, gateway_order_id, total_amount, order_items, shipping_address, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) ON CONFLICT (payment_id) DO NOTHING RETURNING id",
        )
        .bind(order.id())
        .bind(order.user_id())
        .bind(order.payment_id())
        .bind(order.gateway_order_id())
        .bind(order.total_amount())
        .bind(Json(order.items()))
        .bind(Json(order.shipping_address()))
        .bind(order.status().as_str())
        .bind(order.created_at())
        .fetch_optional(&self.pool)
        .await?;

        if let Some((order_id,)) = inserted {
            return Ok(InsertOutcome { order_id, created: true });
        }
        let (order_id,): (Uuid,) = sqlx::query_as("SELECT id FROM orders WHERE payment_id = $1")
            .bind(order.payment_id())
            .fetch_one(&self.pool)
            .await?;
        tracing::warn!(payment_id = %order.payment_id(), %order_id, "duplicate order submission for payment");
        Ok(InsertOutcome { order_id, created: false })
    }

    async fn find(&self, id: Uuid) -> Result<Option<Order>, RepositoryError> {
        sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Order::try_from)
            .transpose()
    }

    async fn list(&self, page: u32, per_page: u32) -> Result<(Vec<Order>, i64), RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(per_page))
        .bind(offset(page, per_page))
        .fetch_all(&self.pool)
        .await?;
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders").fetch_one(&self.pool).await?;
        Ok((rows.into_iter().map(Order::try_from).collect::<Result<_, _>>()?, total))
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Order::try_from).collect()
    }

    async fn update_status(&self, id: Uuid, expected: OrderStatus, target: OrderStatus) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE orders SET status = $3 WHERE id = $1 AND status = $2")
            .bind(id)
            .bind(expected.as_str())
            .bind(target.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn sales_totals(&self, since: DateTime<Utc>) -> Result<SalesTotals, RepositoryError> {
        let (total_revenue, recent_sales, active_orders): (Decimal, Decimal, i64) = sqlx::query_as(
            "SELECT COALESCE(SUM(total_amount) FILTER (WHERE status <> $2), 0), \
                    COALESCE(SUM(total_amount) FILTER (WHERE status <> $2 AND created_at >= $1), 0), \
                    COUNT(*) FILTER (WHERE status IN ($3, $4)) \
             FROM orders",
        )
        .bind(since)
        .bind(OrderStatus::Cancelled.as_str())
        .bind(OrderStatus::Processing.as_str())
        .bind(OrderStatus::Shipped.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(SalesTotals { total_revenue, recent_sales, active_orders })
    }
}

#[derive(Clone)]
pub struct PgProducts { pool: PgPool }

impl PgProducts {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl ProductRepository for PgProducts {
    async fn list(&self, page: u32, per_page: u32, search: Option<&str>) -> Result<(Vec<Product>, i64), RepositoryError> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE ($3::text IS NULL OR strpos(lower(title), lower($3)) > 0) \
             ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(i64::from(per_page))
        .bind(offset(page, per_page))
        .bind(search)
        .fetch_all(&self.pool)
        .await?;
        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM products WHERE ($1::text IS NULL OR strpos(lower(title), lower($1)) > 0)")
                .bind(search)
                .fetch_one(&self.pool)
                .await?;
        Ok((products, total))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Product>, RepositoryError> {
        Ok(sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(&self.pool).await?)
    }

    async fn insert(&self, p: &Product) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO products (id, title, description, base_price, stock, sizes, colors, images, is_new_arrival, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(p.id)
        .bind(&p.title)
        .bind(&p.description)
        .bind(p.base_price)
        .bind(p.stock)
        .bind(&p.sizes)
        .bind(&p.colors)
        .bind(&p.images)
        .bind(p.is_new_arrival)
        .bind(p.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn stock_counts(&self) -> Result<StockCounts, RepositoryError> {
        let (low_stock, out_of_stock): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*) FILTER (WHERE stock > 0 AND stock <= $1), COUNT(*) FILTER (WHERE stock <= 0) FROM products",
        )
        .bind(LOW_STOCK_THRESHOLD)
        .fetch_one(&self.pool)
        .await?;
        Ok(StockCounts { low_stock, out_of_stock })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    auth_id: String,
    email: String,
    full_name: Option<String>,
    avatar_url: Option<String>,
    role: String,
    onboarding_completed: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for UserProfile {
    type Error = RepositoryError;
    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let role = UserRole::parse(&r.role).ok_or_else(|| RepositoryError::Corrupt(format!("user {}: role {:?}", r.id, r.role)))?;
        Ok(Self {
            id: r.id,
            auth_id: r.auth_id,
            email: r.email,
            full_name: r.full_name,
            avatar_url: r.avatar_url,
            role,
            onboarding_completed: r.onboarding_completed,
            created_at: r.created_at,
        })
    }
}

const USER_COLUMNS: &str = "id, auth_id, email, full_name, avatar_url, role, onboarding_completed, created_at";

#[derive(Clone)]
pub struct PgUsers { pool: PgPool }

impl PgUsers {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl UserRepository for PgUsers {
    async fn insert(&self, u: &UserProfile) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO users (id, auth_id, email, full_name, avatar_url, role, onboarding_completed, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) ON CONFLICT (auth_id) DO NOTHING",
        )
        .bind(u.id)
        .bind(&u.auth_id)
        .bind(&u.email)
        .bind(&u.full_name)
        .bind(&u.avatar_url)
        .bind(u.role.as_str())
        .bind(u.onboarding_completed)
        .bind(u.created_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::Duplicate(format!("user {}", u.auth_id)));
        }
        Ok(())
    }

    async fn update_by_auth_id(&self, auth_id: &str, update: &UserUpdate) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET email = $2, full_name = $3, avatar_url = $4, onboarding_completed = TRUE WHERE auth_id = $1",
        )
        .bind(auth_id)
        .bind(&update.email)
        .bind(&update.full_name)
        .bind(&update.avatar_url)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_auth_id(&self, auth_id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE auth_id = $1").bind(auth_id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_customers(&self, page: u32, per_page: u32) -> Result<(Vec<UserProfile>, i64), RepositoryError> {
        self.page_where("role = 'customer'", page, per_page).await
    }

    async fn count_customers(&self) -> Result<i64, RepositoryError> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = 'customer'").fetch_one(&self.pool).await?;
        Ok(total)
    }

    async fn list_staff(&self, page: u32, per_page: u32) -> Result<(Vec<UserProfile>, i64), RepositoryError> {
        self.page_where("role <> 'customer'", page, per_page).await
    }

    async fn find(&self, id: Uuid) -> Result<Option<UserProfile>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(UserProfile::try_from)
            .transpose()
    }

    async fn update_staff(&self, id: Uuid, role: UserRole, active: bool) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE users SET role = $2, onboarding_completed = $3 WHERE id = $1")
            .bind(id)
            .bind(role.as_str())
            .bind(active)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

impl PgUsers {
    async fn page_where(&self, filter: &'static str, page: u32, per_page: u32) -> Result<(Vec<UserProfile>, i64), RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {filter} ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(per_page))
        .bind(offset(page, per_page))
        .fetch_all(&self.pool)
        .await?;
        let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM users WHERE {filter}")).fetch_one(&self.pool).await?;
        Ok((rows.into_iter().map(UserProfile::try_from).collect::<Result<_, _>>()?, total))
    }
}
