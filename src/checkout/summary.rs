//! Order totals shown on the checkout screen and charged to the shopper.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::CartStore;
use crate::domain::value_objects::Money;

/// GST applied to the cart subtotal, in percent.
const GST_PERCENT: i64 = 18;
const SHIPPING_FEE: i64 = 99;
const FREE_SHIPPING_THRESHOLD: i64 = 1500;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSummary {
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    /// Whole rupees; this is what the gateway charges.
    pub total: Money,
}

impl CheckoutSummary {
    pub fn for_cart(cart: &CartStore) -> Self {
        let currency = cart.currency();
        let subtotal = cart.total();
        let tax = Money::new(subtotal.amount() * Decimal::new(GST_PERCENT, 2), currency);
        let shipping = if subtotal.amount() >= Decimal::from(FREE_SHIPPING_THRESHOLD) {
            Money::zero(currency)
        } else {
            Money::new(Decimal::from(SHIPPING_FEE), currency)
        };
        let total = Money::new(subtotal.amount() + tax.amount() + shipping.amount(), currency).rounded();
        Self { subtotal, tax, shipping, total }
    }

    pub fn is_free_shipping(&self) -> bool { self.shipping.amount().is_zero() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::NewCartItem;

    fn cart_with(price: i64, quantity: u32) -> CartStore {
        let mut cart = CartStore::default();
        cart.add_item(NewCartItem {
            product_id: "P1".into(), name: "Tee".into(), price: Decimal::from(price), image: String::new(),
            size: None, color: None, quantity,
        });
        cart
    }

    #[test]
    fn test_small_order_pays_shipping() {
        let summary = CheckoutSummary::for_cart(&cart_with(499, 1));
        assert_eq!(summary.tax.amount(), Decimal::new(8982, 2));
        assert_eq!(summary.shipping.amount(), Decimal::from(99));
        // 499 + 89.82 + 99 = 687.82
        assert_eq!(summary.total.amount(), Decimal::from(688));
        assert!(!summary.is_free_shipping());
    }

    #[test]
    fn test_free_shipping_at_threshold() {
        let summary = CheckoutSummary::for_cart(&cart_with(750, 2));
        assert!(summary.is_free_shipping());
        assert_eq!(summary.total.amount(), Decimal::from(1770));
    }

    #[test]
    fn test_total_rounds_half_up() {
        // 1525 * 1.18 = 1799.5
        let summary = CheckoutSummary::for_cart(&cart_with(1525, 1));
        assert_eq!(summary.total.amount(), Decimal::from(1800));
    }
}
