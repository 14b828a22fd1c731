//! Storefront domain model
pub mod aggregates;
pub mod dashboard;
pub mod events;
pub mod value_objects;
