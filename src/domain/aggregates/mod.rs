//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;
pub mod wishlist;
pub mod user;

pub use product::{NewProduct, Product, ProductError};
pub use order::{Order, OrderError, OrderItem, OrderRecord, OrderStatus};
pub use cart::{CartItem, CartStore, NewCartItem};
pub use wishlist::{WishlistItem, WishlistStore, WISHLIST_STORAGE_KEY};
pub use user::{staff_role, NewStaff, UserError, UserProfile, UserRole, UserUpdate};
