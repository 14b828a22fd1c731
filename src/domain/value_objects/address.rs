//! Shipping address snapshot captured at checkout.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const MIN_PHONE_LEN: usize = 10;
const PINCODE_LEN: usize = 6;

/// Stored inline with the order and never updated afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("Full Name is required")]
    MissingName,
    #[error("Valid phone number is required")]
    InvalidPhone,
    #[error("Address is required")]
    MissingAddress,
    #[error("City is required")]
    MissingCity,
    #[error("State is required")]
    MissingState,
    #[error("Valid 6-digit pincode is required")]
    InvalidPincode,
}

impl AddressError {
    /// Form field the message belongs to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingName => "full_name",
            Self::InvalidPhone => "phone",
            Self::MissingAddress => "address",
            Self::MissingCity => "city",
            Self::MissingState => "state",
            Self::InvalidPincode => "pincode",
        }
    }
}

impl ShippingAddress {
    /// Checks fields in form order and reports the first problem.
    pub fn validate(&self) -> Result<(), AddressError> {
        if self.full_name.trim().is_empty() { return Err(AddressError::MissingName); }
        let phone = self.phone.trim();
        if phone.is_empty() || phone.chars().count() < MIN_PHONE_LEN { return Err(AddressError::InvalidPhone); }
        if self.address.trim().is_empty() { return Err(AddressError::MissingAddress); }
        if self.city.trim().is_empty() { return Err(AddressError::MissingCity); }
        if self.state.trim().is_empty() { return Err(AddressError::MissingState); }
        let pincode = self.pincode.trim();
        if pincode.len() != PINCODE_LEN || !pincode.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AddressError::InvalidPincode);
        }
        Ok(())
    }
}
