//! Cart Aggregate
//!
//! The shopper's in-progress selection. Lives only in memory; it is owned by
//! the session that created it and handed to the checkout flow by reference.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::domain::value_objects::{Money, Quantity, VariantKey, DEFAULT_CURRENCY};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub key: VariantKey,
    pub product_id: String,
    pub name: String,
    pub price: Decimal,
    pub image: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: Quantity,
}

impl CartItem {
    pub fn line_total(&self, currency: &str) -> Money { Money::new(self.price, currency).multiply(self.quantity.value()) }
}

/// A cart line before it has a variant key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewCartItem {
    pub product_id: String,
    pub name: String,
    pub price: Decimal,
    pub image: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: u32,
}

impl NewCartItem {
    pub fn variant_key(&self) -> VariantKey {
        VariantKey::new(self.product_id.clone(), self.size.as_deref(), self.color.as_deref())
    }
}

#[derive(Clone, Debug)]
pub struct CartStore {
    items: Vec<CartItem>,
    currency: String,
}

impl CartStore {
    pub fn new(currency: &str) -> Self {
        Self { items: vec![], currency: currency.to_string() }
    }

    pub fn currency(&self) -> &str { &self.currency }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn get(&self, key: &VariantKey) -> Option<&CartItem> { self.items.iter().find(|i| &i.key == key) }

    /// Merges into the line with the same variant key, or appends a new line.
    pub fn add_item(&mut self, item: NewCartItem) {
        let key = item.variant_key();
        if let Some(existing) = self.items.iter_mut().find(|i| i.key == key) {
            existing.quantity = existing.quantity.add(item.quantity);
            tracing::debug!(%key, quantity = existing.quantity.value(), "cart line merged");
            return;
        }
        tracing::debug!(%key, quantity = item.quantity, "cart line added");
        self.items.push(CartItem {
            key,
            product_id: item.product_id,
            name: item.name,
            price: item.price,
            image: item.image,
            size: item.size,
            color: item.color,
            quantity: Quantity::clamped(i64::from(item.quantity)),
        });
    }

    pub fn remove_item(&mut self, key: &VariantKey) {
        self.items.retain(|i| &i.key != key);
    }

    /// Overwrites the quantity, never going below one. Removal is `remove_item`.
    pub fn update_quantity(&mut self, key: &VariantKey, quantity: i64) {
        if let Some(item) = self.items.iter_mut().find(|i| &i.key == key) {
            item.quantity = Quantity::clamped(quantity);
        }
    }

    pub fn clear(&mut self) { self.items.clear(); }

    pub fn total(&self) -> Money {
        self.items.iter().fold(Money::zero(&self.currency), |acc, i| acc.add(&i.line_total(&self.currency)).unwrap_or(acc))
    }

    /// Sum of quantities, for the badge.
    pub fn count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity.value())).sum()
    }
}

impl Default for CartStore {
    fn default() -> Self { Self::new(DEFAULT_CURRENCY) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tee(size: &str, color: &str, quantity: u32) -> NewCartItem {
        NewCartItem {
            product_id: "P1".into(),
            name: "Box Logo Tee".into(),
            price: Decimal::new(1299, 0),
            image: "https://img.example/tee.jpg".into(),
            size: Some(size.into()),
            color: Some(color.into()),
            quantity,
        }
    }

    #[test]
    fn test_same_variant_merges() {
        let mut cart = CartStore::default();
        cart.add_item(tee("M", "Black", 1));
        cart.add_item(tee("M", "Black", 2));
        cart.add_item(tee("M", "Black", 4));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity.value(), 7);
        assert_eq!(cart.items()[0].key.to_string(), "P1-M-Black");
    }

    #[test]
    fn test_distinct_variants_stay_separate() {
        let mut cart = CartStore::default();
        cart.add_item(tee("M", "Black", 1));
        cart.add_item(tee("L", "Black", 1));
        cart.add_item(tee("M", "White", 1));
        assert_eq!(cart.items().len(), 3);
        assert_eq!(cart.count(), 3);
    }

    #[test]
    fn test_missing_variant_fields_share_default_key() {
        let mut cart = CartStore::default();
        let mut plain = tee("M", "Black", 1);
        plain.size = None;
        plain.color = None;
        cart.add_item(plain.clone());
        cart.add_item(plain);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].key.to_string(), "P1-default-default");
    }

    #[test]
    fn test_quantity_floor() {
        let mut cart = CartStore::default();
        cart.add_item(tee("M", "Black", 3));
        let key = cart.items()[0].key.clone();
        for n in [0, -1, -100] {
            cart.update_quantity(&key, n);
            assert_eq!(cart.get(&key).unwrap().quantity.value(), 1);
        }
        cart.update_quantity(&key, 5);
        assert_eq!(cart.get(&key).unwrap().quantity.value(), 5);
    }

    #[test]
    fn test_absent_key_is_noop() {
        let mut cart = CartStore::default();
        cart.add_item(tee("M", "Black", 2));
        let missing = VariantKey::new("P9", None, None);
        cart.update_quantity(&missing, 3);
        cart.remove_item(&missing);
        assert_eq!(cart.count(), 2);
    }

    #[test]
    fn test_total_after_interleaved_operations() {
        let mut cart = CartStore::default();
        cart.add_item(tee("M", "Black", 2));
        cart.add_item(NewCartItem { product_id: "P2".into(), price: Decimal::new(4999, 1), quantity: 1, ..tee("S", "Red", 1) });
        let tee_key = VariantKey::new("P1", Some("M"), Some("Black"));
        let cap_key = VariantKey::new("P2", Some("S"), Some("Red"));
        cart.update_quantity(&cap_key, 3);
        cart.add_item(tee("M", "Black", 1));
        assert_eq!(cart.total().amount(), Decimal::new(1299 * 3, 0) + Decimal::new(4999 * 3, 1));

        cart.remove_item(&tee_key);
        assert_eq!(cart.total().amount(), Decimal::new(4999 * 3, 1));
        assert_eq!(cart.count(), 3);

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total().amount(), Decimal::ZERO);
    }

    #[test]
    fn test_new_line_never_zero() {
        let mut cart = CartStore::default();
        cart.add_item(tee("M", "Black", 0));
        assert_eq!(cart.items()[0].quantity.value(), 1);
    }
}
