//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - Postgres connection string; without it the server keeps
//!   everything in memory
//! - `DATABASE_MAX_CONNECTIONS` - pool size (default: 10)
//! - `PORT` - listen port (default: 3000)
//! - `RAZORPAY_KEY_ID` / `RAZORPAY_KEY_SECRET` - gateway credentials
//! - `RAZORPAY_API_BASE` - gateway base URL (default: https://api.razorpay.com)
//! - `AUTH_WEBHOOK_SECRET` - `whsec_` signing secret for user sync
//! - `ADMIN_API_TOKEN` - bearer token for admin routes
//! - `DEFAULT_CURRENCY` - currency for payment intents (default: INR)

use thiserror::Error;

use crate::domain::value_objects::DEFAULT_CURRENCY;
use crate::gateway::RAZORPAY_API_BASE;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub port: u16,
    pub razorpay_key_id: String,
    pub razorpay_key_secret: String,
    pub razorpay_api_base: String,
    pub auth_webhook_secret: Option<String>,
    pub admin_api_token: Option<String>,
    pub default_currency: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("AppConfig")
            .field("database_url", &redact(&self.database_url))
            .field("database_max_connections", &self.database_max_connections)
            .field("port", &self.port)
            .field("razorpay_key_id", &self.razorpay_key_id)
            .field("razorpay_key_secret", &"[REDACTED]")
            .field("razorpay_api_base", &self.razorpay_api_base)
            .field("auth_webhook_secret", &redact(&self.auth_webhook_secret))
            .field("admin_api_token", &redact(&self.admin_api_token))
            .field("default_currency", &self.default_currency)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            database_max_connections: DEFAULT_MAX_CONNECTIONS,
            port: DEFAULT_PORT,
            razorpay_key_id: String::new(),
            razorpay_key_secret: String::new(),
            razorpay_api_base: RAZORPAY_API_BASE.to_string(),
            auth_webhook_secret: None,
            admin_api_token: None,
            default_currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

impl AppConfig {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let port = match get("PORT") {
            Some(v) => v.parse().map_err(|_| ConfigError::InvalidEnvVar("PORT".into(), v))?,
            None => defaults.port,
        };
        let database_max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(v) => match v.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::InvalidEnvVar("DATABASE_MAX_CONNECTIONS".into(), v)),
            },
            None => defaults.database_max_connections,
        };
        let default_currency = match get("DEFAULT_CURRENCY") {
            Some(v) if v.len() == 3 && v.chars().all(|c| c.is_ascii_alphabetic()) => v.to_ascii_uppercase(),
            Some(v) => return Err(ConfigError::InvalidEnvVar("DEFAULT_CURRENCY".into(), v)),
            None => defaults.default_currency,
        };

        Ok(Self {
            database_url: get("DATABASE_URL"),
            database_max_connections,
            port,
            razorpay_key_id: get("RAZORPAY_KEY_ID").unwrap_or_default(),
            razorpay_key_secret: get("RAZORPAY_KEY_SECRET").unwrap_or_default(),
            razorpay_api_base: get("RAZORPAY_API_BASE").unwrap_or(defaults.razorpay_api_base),
            auth_webhook_secret: get("AUTH_WEBHOOK_SECRET"),
            admin_api_token: get("ADMIN_API_TOKEN"),
            default_currency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn test_defaults_apply() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.database_max_connections, 10);
        assert_eq!(cfg.default_currency, "INR");
        assert_eq!(cfg.razorpay_api_base, RAZORPAY_API_BASE);
        assert!(cfg.database_url.is_none());
        assert!(cfg.admin_api_token.is_none());
    }

    #[test]
    fn test_reads_values_and_ignores_blanks() {
        let cfg = load(&[("PORT", "8080"), ("ADMIN_API_TOKEN", "  "), ("DEFAULT_CURRENCY", "usd"), ("DATABASE_URL", "postgres://x")]).unwrap();
        assert_eq!(cfg.port, 8080);
        assert!(cfg.admin_api_token.is_none());
        assert_eq!(cfg.default_currency, "USD");
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://x"));
    }

    #[test]
    fn test_rejects_bad_numbers() {
        assert_eq!(load(&[("PORT", "http")]).unwrap_err(), ConfigError::InvalidEnvVar("PORT".into(), "http".into()));
        assert!(load(&[("DATABASE_MAX_CONNECTIONS", "0")]).is_err());
        assert!(load(&[("DEFAULT_CURRENCY", "RUPEE")]).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let cfg = load(&[("RAZORPAY_KEY_SECRET", "rzp_secret_value"), ("DATABASE_URL", "postgres://u:pw@h/db")]).unwrap();
        let out = format!("{cfg:?}");
        assert!(!out.contains("rzp_secret_value"));
        assert!(!out.contains("pw@h"));
    }
}
