//! Local projection of an auth-provider user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Customer,
    Admin,
    SuperAdmin,
    InventoryManager,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
            Self::InventoryManager => "inventory_manager",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "customer" => Some(Self::Customer),
            "admin" => Some(Self::Admin),
            "super_admin" => Some(Self::SuperAdmin),
            "inventory_manager" => Some(Self::InventoryManager),
            _ => None,
        }
    }

    pub fn is_staff(&self) -> bool { !matches!(self, Self::Customer) }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    /// Identifier issued by the auth provider.
    pub auth_id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: UserRole,
    pub onboarding_completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields the auth provider may change after sign-up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserUpdate {
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Staff member added from the admin team page.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct NewStaff {
    pub email: String,
    #[serde(default, alias = "fullName")]
    pub full_name: Option<String>,
    /// Defaults to `inventory_manager`.
    #[serde(default)]
    pub role: Option<String>,
    /// Auth-provider id when the account already exists there.
    #[serde(default, alias = "authId")]
    pub auth_id: Option<String>,
}

impl UserProfile {
    /// Staff accounts are created by an admin and need no onboarding.
    pub fn new_staff(new: NewStaff) -> Result<Self, UserError> {
        let email = new.email.trim().to_string();
        if !email.contains('@') {
            return Err(UserError::InvalidEmail);
        }
        let role = staff_role(new.role.as_deref().unwrap_or("inventory_manager"))?;
        let id = Uuid::now_v7();
        let auth_id = match new.auth_id.as_deref().map(str::trim) {
            Some(a) if !a.is_empty() => a.to_string(),
            _ => format!("staff_{id}"),
        };
        Ok(Self {
            id,
            auth_id,
            email,
            full_name: new.full_name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            avatar_url: None,
            role,
            onboarding_completed: true,
            created_at: Utc::now(),
        })
    }
}

/// Parses a role an admin may grant. Customers are not staff.
pub fn staff_role(s: &str) -> Result<UserRole, UserError> {
    let role = UserRole::parse(s.trim()).ok_or_else(|| UserError::UnknownRole(s.to_string()))?;
    if !role.is_staff() {
        return Err(UserError::NotStaffRole(role));
    }
    Ok(role)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserError {
    #[error("A valid email is required")]
    InvalidEmail,
    #[error("Unknown role: {0}")]
    UnknownRole(String),
    #[error("Role {} cannot be granted to staff", .0.as_str())]
    NotStaffRole(UserRole),
    #[error("User is not a staff member")]
    NotStaff,
}
