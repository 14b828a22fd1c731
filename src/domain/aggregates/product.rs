//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub base_price: Decimal,
    pub stock: i32,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub images: Vec<String>,
    pub is_new_arrival: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields an admin fills in when creating a drop.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub base_price: Decimal,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub is_new_arrival: bool,
}

impl Product {
    pub fn create(new: NewProduct) -> Result<Self, ProductError> {
        let title = new.title.trim().to_string();
        if title.is_empty() { return Err(ProductError::MissingTitle); }
        if new.base_price < Decimal::ZERO { return Err(ProductError::NegativePrice); }
        if new.stock < 0 { return Err(ProductError::NegativeStock); }
        Ok(Self {
            id: Uuid::now_v7(),
            title,
            description: new.description.filter(|d| !d.trim().is_empty()),
            base_price: new.base_price,
            stock: new.stock,
            sizes: new.sizes,
            colors: new.colors,
            images: new.images,
            is_new_arrival: new.is_new_arrival,
            created_at: Utc::now(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductError {
    #[error("Product title is required")]
    MissingTitle,
    #[error("Price cannot be negative")]
    NegativePrice,
    #[error("Stock cannot be negative")]
    NegativeStock,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_create() {
        let p = Product::create(NewProduct {
            title: "  Cargo Pants ".into(),
            description: Some(" ".into()),
            base_price: Decimal::new(2499, 0),
            stock: 10,
            ..NewProduct::default()
        }).unwrap();
        assert_eq!(p.title, "Cargo Pants");
        assert_eq!(p.description, None);
        assert_eq!(p.stock, 10);
    }

    #[test]
    fn test_product_rejects_bad_input() {
        let base = NewProduct { title: "Cap".into(), base_price: Decimal::ONE, ..NewProduct::default() };
        assert_eq!(Product::create(NewProduct { title: " ".into(), ..base.clone() }), Err(ProductError::MissingTitle));
        assert_eq!(Product::create(NewProduct { base_price: Decimal::NEGATIVE_ONE, ..base.clone() }), Err(ProductError::NegativePrice));
        assert_eq!(Product::create(NewProduct { stock: -1, ..base }), Err(ProductError::NegativeStock));
    }
}
