//! Wishlist Aggregate
//!
//! Liked products, persisted to device storage on every change and
//! rehydrated on startup. Not synced to the server.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::storage::{KeyValueStorage, StorageError};

pub const WISHLIST_STORAGE_KEY: &str = "wishlist-storage";

/// Snapshot of a product, enough to reopen its detail page without a refetch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WishlistItem {
    pub id: String,
    pub title: String,
    pub brand: String,
    pub price: Decimal,
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sizes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<String>,
}

pub struct WishlistStore<S> {
    storage: S,
    items: Vec<WishlistItem>,
}

impl<S: KeyValueStorage> WishlistStore<S> {
    pub fn load(storage: S) -> Result<Self, StorageError> {
        let items = match storage.get_item(WISHLIST_STORAGE_KEY)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|source| StorageError::Corrupt {
                key: WISHLIST_STORAGE_KEY.to_string(),
                source,
            })?,
            None => vec![],
        };
        tracing::debug!(count = items.len(), "wishlist rehydrated");
        Ok(Self { storage, items })
    }

    pub fn items(&self) -> &[WishlistItem] { &self.items }
    pub fn len(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn is_wishlisted(&self, id: &str) -> bool {
        self.items.iter().any(|i| i.id == id)
    }

    /// Adds when absent, removes when present. Returns whether the product is
    /// wishlisted afterwards.
    pub fn toggle(&mut self, item: WishlistItem) -> Result<bool, StorageError> {
        if self.is_wishlisted(&item.id) {
            self.remove_item(&item.id)?;
            Ok(false)
        } else {
            self.add_item(item)?;
            Ok(true)
        }
    }

    pub fn add_item(&mut self, item: WishlistItem) -> Result<(), StorageError> {
        if self.is_wishlisted(&item.id) { return Ok(()); }
        let mut next = self.items.clone();
        next.push(item);
        self.commit(next)
    }

    pub fn remove_item(&mut self, id: &str) -> Result<(), StorageError> {
        if !self.is_wishlisted(id) { return Ok(()); }
        let next = self.items.iter().filter(|i| i.id != id).cloned().collect();
        self.commit(next)
    }

    // Persist first so a failed write leaves the visible set untouched.
    fn commit(&mut self, next: Vec<WishlistItem>) -> Result<(), StorageError> {
        let raw = serde_json::to_string(&next).map_err(|source| StorageError::Corrupt {
            key: WISHLIST_STORAGE_KEY.to_string(),
            source,
        })?;
        self.storage.set_item(WISHLIST_STORAGE_KEY, &raw)?;
        self.items = next;
        Ok(())
    }
}
