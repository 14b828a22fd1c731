//! Auth-provider user sync.
//!
//! The provider signs each delivery svix-style: HMAC-SHA256 over
//! `{id}.{timestamp}.{body}` keyed with the base64 part of a `whsec_` secret.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{UserProfile, UserRole, UserUpdate};
use crate::repository::{RepositoryError, UserRepository};

type HmacSha256 = Hmac<Sha256>;

pub const ID_HEADER: &str = "svix-id";
pub const TIMESTAMP_HEADER: &str = "svix-timestamp";
pub const SIGNATURE_HEADER: &str = "svix-signature";

const SECRET_PREFIX: &str = "whsec_";
const TOLERANCE_SECS: u64 = 5 * 60;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Missing svix headers")]
    MissingHeaders,
    #[error("webhook secret is not valid base64")]
    InvalidSecret,
    #[error("Verification error")]
    InvalidSignature,
    #[error("timestamp outside tolerance")]
    TimestampOutOfRange,
    #[error("malformed timestamp")]
    MalformedTimestamp,
    #[error("invalid payload: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct WebhookVerifier {
    key: Vec<u8>,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier").field("key", &"[REDACTED]").finish()
    }
}

impl WebhookVerifier {
    pub fn new(secret: &str) -> Result<Self, WebhookError> {
        let encoded = secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret);
        let key = STANDARD.decode(encoded).map_err(|_| WebhookError::InvalidSecret)?;
        if key.is_empty() {
            return Err(WebhookError::InvalidSecret);
        }
        Ok(Self { key })
    }

    fn mac(&self, id: &str, timestamp: &str, body: &[u8]) -> Result<HmacSha256, WebhookError> {
        let mut mac = HmacSha256::new_from_slice(&self.key).map_err(|_| WebhookError::InvalidSecret)?;
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(mac)
    }

    /// Signature header value for a payload.
    pub fn sign(&self, id: &str, timestamp: &str, body: &[u8]) -> Result<String, WebhookError> {
        Ok(format!("v1,{}", STANDARD.encode(self.mac(id, timestamp, body)?.finalize().into_bytes())))
    }

    pub fn verify(
        &self,
        id: &str,
        timestamp: &str,
        signatures: &str,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<(), WebhookError> {
        if id.is_empty() || timestamp.is_empty() || signatures.is_empty() {
            return Err(WebhookError::MissingHeaders);
        }
        let ts: i64 = timestamp.trim().parse().map_err(|_| WebhookError::MalformedTimestamp)?;
        if now.timestamp().abs_diff(ts) > TOLERANCE_SECS {
            return Err(WebhookError::TimestampOutOfRange);
        }

        let mac = self.mac(id, timestamp, body)?;
        let matched = signatures
            .split_whitespace()
            .filter_map(|entry| entry.strip_prefix("v1,"))
            .filter_map(|sig| STANDARD.decode(sig).ok())
            .any(|sig| mac.clone().verify_slice(&sig).is_ok());
        if matched { Ok(()) } else { Err(WebhookError::InvalidSignature) }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EmailAddress {
    pub email_address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub unsafe_metadata: Option<Value>,
    /// Milliseconds since the epoch.
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl AuthUser {
    pub fn primary_email(&self) -> Option<&str> {
        self.email_addresses.first().map(|e| e.email_address.as_str()).filter(|e| !e.is_empty())
    }

    /// `unsafe_metadata.name` wins (set by the mobile sign-up), then first + last.
    pub fn display_name(&self) -> Option<String> {
        let meta = self
            .unsafe_metadata
            .as_ref()
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty());
        let name = match meta {
            Some(n) => n.to_string(),
            None => [self.first_name.as_deref(), self.last_name.as_deref()]
                .into_iter()
                .flatten()
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        };
        if name.trim().is_empty() { None } else { Some(name) }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    UserCreated(AuthUser),
    UserUpdated(AuthUser),
    UserDeleted { id: Option<String> },
    Ignored(String),
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
struct DeletedUser {
    #[serde(default)]
    id: Option<String>,
}

impl AuthEvent {
    pub fn parse(body: &[u8]) -> Result<Self, WebhookError> {
        let raw: RawEvent = serde_json::from_slice(body)?;
        Ok(match raw.kind.as_str() {
            "user.created" => Self::UserCreated(serde_json::from_value(raw.data)?),
            "user.updated" => Self::UserUpdated(serde_json::from_value(raw.data)?),
            "user.deleted" => Self::UserDeleted { id: serde_json::from_value::<DeletedUser>(raw.data)?.id },
            _ => Self::Ignored(raw.kind),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Created,
    /// Redelivery of a user we already hold.
    AlreadySynced,
    Updated,
    Deleted,
    /// Nothing matched or the event carried too little to act on.
    Skipped,
    Ignored,
}

pub async fn apply(users: &dyn UserRepository, event: AuthEvent) -> Result<SyncOutcome, RepositoryError> {
    match event {
        AuthEvent::UserCreated(user) => {
            let Some(email) = user.primary_email() else {
                tracing::info!(auth_id = %user.id, "user.created without email, skipping");
                return Ok(SyncOutcome::Skipped);
            };
            let created_at = user
                .created_at
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
                .unwrap_or_else(Utc::now);
            let profile = UserProfile {
                id: Uuid::now_v7(),
                auth_id: user.id.clone(),
                email: email.to_string(),
                full_name: user.display_name(),
                avatar_url: user.image_url.clone(),
                role: UserRole::Customer,
                onboarding_completed: true,
                created_at,
            };
            match users.insert(&profile).await {
                Ok(()) => {
                    tracing::info!(auth_id = %profile.auth_id, user_id = %profile.id, "user synced");
                    Ok(SyncOutcome::Created)
                }
                Err(RepositoryError::Duplicate(_)) => {
                    tracing::info!(auth_id = %profile.auth_id, "user already synced");
                    Ok(SyncOutcome::AlreadySynced)
                }
                Err(e) => Err(e),
            }
        }
        AuthEvent::UserUpdated(user) => {
            let Some(email) = user.primary_email() else {
                tracing::info!(auth_id = %user.id, "user.updated without email, skipping");
                return Ok(SyncOutcome::Skipped);
            };
            let update = UserUpdate { email: email.to_string(), full_name: user.display_name(), avatar_url: user.image_url.clone() };
            if users.update_by_auth_id(&user.id, &update).await? {
                tracing::info!(auth_id = %user.id, "user updated");
                Ok(SyncOutcome::Updated)
            } else {
                tracing::warn!(auth_id = %user.id, "user.updated for unknown user");
                Ok(SyncOutcome::Skipped)
            }
        }
        AuthEvent::UserDeleted { id: Some(id) } => {
            if users.delete_by_auth_id(&id).await? {
                tracing::info!(auth_id = %id, "user deleted");
                Ok(SyncOutcome::Deleted)
            } else {
                Ok(SyncOutcome::Skipped)
            }
        }
        AuthEvent::UserDeleted { id: None } => Ok(SyncOutcome::Skipped),
        AuthEvent::Ignored(kind) => {
            tracing::debug!(%kind, "ignoring webhook event");
            Ok(SyncOutcome::Ignored)
        }
    }
}
