//! In-process repositories for tests and runs without a database.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{InsertOutcome, OrderRepository, ProductRepository, RepositoryError, UserRepository};
use crate::domain::aggregates::{Order, OrderRecord, OrderStatus, Product, UserProfile, UserRole, UserUpdate};
use crate::domain::dashboard::{SalesTotals, StockCounts};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

fn page_of<T: Clone>(items: &[T], page: u32, per_page: u32) -> Vec<T> {
    let start = usize::try_from(super::offset(page, per_page)).unwrap_or(usize::MAX);
    items.iter().skip(start).take(per_page as usize).cloned().collect()
}

/// Newest first; ties keep the later insert first.
fn newest_first(records: &[OrderRecord]) -> Vec<OrderRecord> {
    let mut out: Vec<OrderRecord> = records.iter().rev().cloned().collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out
}

#[derive(Debug, Default)]
pub struct InMemoryOrders {
    rows: RwLock<Vec<OrderRecord>>,
}

impl InMemoryOrders {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl OrderRepository for InMemoryOrders {
    async fn insert(&self, order: &Order) -> Result<InsertOutcome, RepositoryError> {
        let mut rows = write(&self.rows);
        if let Some(existing) = rows.iter().find(|r| r.payment_id == order.payment_id()) {
            tracing::warn!(payment_id = %order.payment_id(), order_id = %existing.id, "duplicate order submission for payment");
            return Ok(InsertOutcome { order_id: existing.id, created: false });
        }
        rows.push(order.to_record());
        Ok(InsertOutcome { order_id: order.id(), created: true })
    }

    async fn find(&self, id: Uuid) -> Result<Option<Order>, RepositoryError> {
        Ok(read(&self.rows).iter().find(|r| r.id == id).cloned().map(Order::restore))
    }

    async fn list(&self, page: u32, per_page: u32) -> Result<(Vec<Order>, i64), RepositoryError> {
        let rows = read(&self.rows);
        let sorted = newest_first(&rows);
        let total = sorted.len() as i64;
        Ok((page_of(&sorted, page, per_page).into_iter().map(Order::restore).collect(), total))
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Order>, RepositoryError> {
        let rows = read(&self.rows);
        Ok(newest_first(&rows)
            .into_iter()
            .filter(|r| r.user_id.as_deref() == Some(user_id))
            .map(Order::restore)
            .collect())
    }

    async fn update_status(&self, id: Uuid, expected: OrderStatus, target: OrderStatus) -> Result<bool, RepositoryError> {
        let mut rows = write(&self.rows);
        match rows.iter_mut().find(|r| r.id == id && r.status == expected) {
            Some(row) => {
                row.status = target;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn sales_totals(&self, since: DateTime<Utc>) -> Result<SalesTotals, RepositoryError> {
        let mut totals = SalesTotals::default();
        for r in read(&self.rows).iter() {
            totals.add(r.total_amount, r.status, r.created_at, since);
        }
        Ok(totals)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryProducts {
    rows: RwLock<Vec<Product>>,
}

impl InMemoryProducts {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl ProductRepository for InMemoryProducts {
    async fn list(&self, page: u32, per_page: u32, search: Option<&str>) -> Result<(Vec<Product>, i64), RepositoryError> {
        let needle = search.map(str::to_lowercase);
        let mut matched: Vec<Product> = read(&self.rows)
            .iter()
            .filter(|p| needle.as_deref().map_or(true, |n| p.title.to_lowercase().contains(n)))
            .cloned()
            .collect();
        matched.reverse();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matched.len() as i64;
        Ok((page_of(&matched, page, per_page), total))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Product>, RepositoryError> {
        Ok(read(&self.rows).iter().find(|p| p.id == id).cloned())
    }

    async fn insert(&self, product: &Product) -> Result<(), RepositoryError> {
        let mut rows = write(&self.rows);
        if rows.iter().any(|p| p.id == product.id) {
            return Err(RepositoryError::Duplicate(format!("product {}", product.id)));
        }
        rows.push(product.clone());
        Ok(())
    }

    async fn stock_counts(&self) -> Result<StockCounts, RepositoryError> {
        let mut counts = StockCounts::default();
        for p in read(&self.rows).iter() {
            counts.add(p.stock);
        }
        Ok(counts)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryUsers {
    rows: RwLock<Vec<UserProfile>>,
}

impl InMemoryUsers {
    pub fn new() -> Self { Self::default() }

    pub fn find_by_auth_id(&self, auth_id: &str) -> Option<UserProfile> {
        read(&self.rows).iter().find(|u| u.auth_id == auth_id).cloned()
    }
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn insert(&self, profile: &UserProfile) -> Result<(), RepositoryError> {
        let mut rows = write(&self.rows);
        if rows.iter().any(|u| u.auth_id == profile.auth_id) {
            return Err(RepositoryError::Duplicate(format!("user {}", profile.auth_id)));
        }
        rows.push(profile.clone());
        Ok(())
    }

    async fn update_by_auth_id(&self, auth_id: &str, update: &UserUpdate) -> Result<bool, RepositoryError> {
        let mut rows = write(&self.rows);
        let Some(user) = rows.iter_mut().find(|u| u.auth_id == auth_id) else { return Ok(false) };
        user.email = update.email.clone();
        user.full_name = update.full_name.clone();
        user.avatar_url = update.avatar_url.clone();
        user.onboarding_completed = true;
        Ok(true)
    }

    async fn delete_by_auth_id(&self, auth_id: &str) -> Result<bool, RepositoryError> {
        let mut rows = write(&self.rows);
        let before = rows.len();
        rows.retain(|u| u.auth_id != auth_id);
        Ok(rows.len() != before)
    }

    async fn list_customers(&self, page: u32, per_page: u32) -> Result<(Vec<UserProfile>, i64), RepositoryError> {
        Ok(self.page_where(page, per_page, |u| u.role == UserRole::Customer))
    }

    async fn count_customers(&self) -> Result<i64, RepositoryError> {
        Ok(read(&self.rows).iter().filter(|u| u.role == UserRole::Customer).count() as i64)
    }

    async fn list_staff(&self, page: u32, per_page: u32) -> Result<(Vec<UserProfile>, i64), RepositoryError> {
        Ok(self.page_where(page, per_page, |u| u.role.is_staff()))
    }

    async fn find(&self, id: Uuid) -> Result<Option<UserProfile>, RepositoryError> {
        Ok(read(&self.rows).iter().find(|u| u.id == id).cloned())
    }

    async fn update_staff(&self, id: Uuid, role: UserRole, active: bool) -> Result<bool, RepositoryError> {
        let mut rows = write(&self.rows);
        let Some(user) = rows.iter_mut().find(|u| u.id == id) else { return Ok(false) };
        user.role = role;
        user.onboarding_completed = active;
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let mut rows = write(&self.rows);
        let before = rows.len();
        rows.retain(|u| u.id != id);
        Ok(rows.len() != before)
    }
}

impl InMemoryUsers {
    fn page_where(&self, page: u32, per_page: u32, keep: impl Fn(&UserProfile) -> bool) -> (Vec<UserProfile>, i64) {
        let mut matched: Vec<UserProfile> = read(&self.rows).iter().filter(|u| keep(u)).cloned().collect();
        matched.reverse();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matched.len() as i64;
        (page_of(&matched, page, per_page), total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{NewProduct, OrderItem};
    use crate::domain::value_objects::ShippingAddress;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn order(payment_id: &str, user: &str) -> Order {
        let item = OrderItem {
            product_id: "P1".into(), name: "Hoodie".into(), image: String::new(), size: Some("L".into()),
            color: None, price: Decimal::new(2499, 0), quantity: 1,
        };
        Order::place(payment_id, None, Some(user.into()), Decimal::new(2949, 0), vec![item], ShippingAddress::default()).unwrap()
    }

    fn user(auth_id: &str, role: UserRole) -> UserProfile {
        UserProfile {
            id: Uuid::now_v7(), auth_id: auth_id.into(), email: format!("{auth_id}@example.com"),
            full_name: None, avatar_url: None, role, onboarding_completed: true, created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_dedupes_on_payment() {
        let repo = InMemoryOrders::new();
        let first = order("pay_A", "u1");
        let created = repo.insert(&first).await.unwrap();
        assert!(created.created);
        let again = repo.insert(&order("pay_A", "u1")).await.unwrap();
        assert_eq!(again, InsertOutcome { order_id: first.id(), created: false });
        assert_eq!(repo.list(1, 20).await.unwrap().1, 1);
    }

    #[tokio::test]
    async fn test_user_orders_newest_first() {
        let repo = InMemoryOrders::new();
        let a = order("pay_1", "u1");
        let b = order("pay_2", "u2");
        let c = order("pay_3", "u1");
        for o in [&a, &b, &c] {
            repo.insert(o).await.unwrap();
        }
        let ids: Vec<Uuid> = repo.list_for_user("u1").await.unwrap().iter().map(Order::id).collect();
        assert_eq!(ids, vec![c.id(), a.id()]);
        assert!(repo.list_for_user("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_conditional_status_update() {
        let repo = InMemoryOrders::new();
        let o = order("pay_1", "u1");
        repo.insert(&o).await.unwrap();
        assert!(!repo.update_status(o.id(), OrderStatus::Shipped, OrderStatus::Delivered).await.unwrap());
        assert!(repo.update_status(o.id(), OrderStatus::Placed, OrderStatus::Processing).await.unwrap());
        assert_eq!(repo.find(o.id()).await.unwrap().unwrap().status(), OrderStatus::Processing);
    }

    #[tokio::test]
    async fn test_product_search_and_paging() {
        let repo = InMemoryProducts::new();
        for title in ["Oversized Tee", "Cargo Pants", "Graphic Tee"] {
            let p = Product::create(NewProduct { title: title.into(), base_price: Decimal::new(999, 0), ..Default::default() }).unwrap();
            repo.insert(&p).await.unwrap();
        }
        let (tees, total) = repo.list(1, 10, Some("tee")).await.unwrap();
        assert_eq!(total, 2);
        assert!(tees.iter().all(|p| p.title.ends_with("Tee")));
        let (page2, total) = repo.list(2, 2, None).await.unwrap();
        assert_eq!((page2.len(), total), (1, 3));
    }

    #[tokio::test]
    async fn test_users_lifecycle() {
        let repo = InMemoryUsers::new();
        repo.insert(&user("user_1", UserRole::Customer)).await.unwrap();
        repo.insert(&user("admin_1", UserRole::Admin)).await.unwrap();
        assert!(matches!(repo.insert(&user("user_1", UserRole::Customer)).await, Err(RepositoryError::Duplicate(_))));

        let update = UserUpdate { email: "new@example.com".into(), full_name: Some("Asha".into()), avatar_url: None };
        assert!(repo.update_by_auth_id("user_1", &update).await.unwrap());
        assert!(!repo.update_by_auth_id("ghost", &update).await.unwrap());
        assert_eq!(repo.find_by_auth_id("user_1").unwrap().email, "new@example.com");

        let (customers, total) = repo.list_customers(1, 10).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(customers[0].auth_id, "user_1");

        assert!(repo.delete_by_auth_id("user_1").await.unwrap());
        assert!(!repo.delete_by_auth_id("user_1").await.unwrap());
    }

    #[tokio::test]
    async fn test_search_treats_wildcards_literally() {
        let repo = InMemoryProducts::new();
        let p = Product::create(NewProduct { title: "Logo Cap".into(), base_price: Decimal::new(799, 0), ..Default::default() }).unwrap();
        repo.insert(&p).await.unwrap();
        assert_eq!(repo.list(1, 10, Some("%")).await.unwrap().1, 0);
        assert_eq!(repo.list(1, 10, Some("_")).await.unwrap().1, 0);
        assert_eq!(repo.list(1, 10, Some("LOGO")).await.unwrap().1, 1);
    }

    #[tokio::test]
    async fn test_staff_management() {
        let repo = InMemoryUsers::new();
        let customer = user("user_1", UserRole::Customer);
        let manager = user("staff_1", UserRole::InventoryManager);
        repo.insert(&customer).await.unwrap();
        repo.insert(&manager).await.unwrap();
        repo.insert(&user("admin_1", UserRole::SuperAdmin)).await.unwrap();

        let (staff, total) = repo.list_staff(1, 10).await.unwrap();
        assert_eq!(total, 2);
        assert!(staff.iter().all(|u| u.role.is_staff()));
        assert_eq!(repo.count_customers().await.unwrap(), 1);

        assert!(repo.update_staff(manager.id, UserRole::Admin, false).await.unwrap());
        let updated = repo.find(manager.id).await.unwrap().unwrap();
        assert_eq!((updated.role, updated.onboarding_completed), (UserRole::Admin, false));
        assert!(!repo.update_staff(Uuid::now_v7(), UserRole::Admin, true).await.unwrap());

        assert!(repo.delete(manager.id).await.unwrap());
        assert!(repo.find(manager.id).await.unwrap().is_none());
        assert!(!repo.delete(manager.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_dashboard_totals() {
        let orders = InMemoryOrders::new();
        let shipped = order("pay_1", "u1");
        let cancelled = order("pay_2", "u1");
        orders.insert(&shipped).await.unwrap();
        orders.insert(&cancelled).await.unwrap();
        orders.update_status(shipped.id(), OrderStatus::Placed, OrderStatus::Shipped).await.unwrap();
        orders.update_status(cancelled.id(), OrderStatus::Placed, OrderStatus::Cancelled).await.unwrap();

        let totals = orders.sales_totals(Utc::now() - chrono::Duration::days(30)).await.unwrap();
        assert_eq!(totals, SalesTotals { total_revenue: Decimal::new(2949, 0), recent_sales: Decimal::new(2949, 0), active_orders: 1 });
        let later = orders.sales_totals(Utc::now() + chrono::Duration::days(1)).await.unwrap();
        assert_eq!(later.recent_sales, Decimal::ZERO);

        let products = InMemoryProducts::new();
        for stock in [0, 3, 20] {
            let p = Product::create(NewProduct { title: "Beanie".into(), base_price: Decimal::ONE, stock, ..Default::default() }).unwrap();
            products.insert(&p).await.unwrap();
        }
        assert_eq!(products.stock_counts().await.unwrap(), StockCounts { low_stock: 1, out_of_stock: 1 });
    }
}
