//! Process configuration, read from the environment once at startup.

use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::Duration;

use brainly_api::AuthConfig;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

const DEFAULT_TOKEN_TTL_DAYS: i64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    /// `None` disables token expiry.
    pub token_ttl: Option<Duration>,
    /// Single allowed origin; permissive CORS when unset.
    pub cors_origin: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables, reading `.env` first
    /// outside of tests.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = var("BRAINLY_JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingVar("BRAINLY_JWT_SECRET".into()))?;
        if PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            return Err(ConfigError::InvalidValue(
                "BRAINLY_JWT_SECRET".into(),
                "still a placeholder".into(),
            ));
        }

        let host = var("BRAINLY_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = var("BRAINLY_PORT").unwrap_or_else(|| "3000".into());
        let bind_address = format!("{}:{}", host, port)
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BRAINLY_HOST/BRAINLY_PORT".into(), e.to_string()))?;

        let db_path = var("BRAINLY_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("brainly.db"));

        let ttl_days = match var("BRAINLY_TOKEN_TTL_DAYS") {
            Some(raw) => raw.parse::<i64>().ok().filter(|d| *d >= 0).ok_or_else(|| {
                ConfigError::InvalidValue(
                    "BRAINLY_TOKEN_TTL_DAYS".into(),
                    format!("'{}' is not a non-negative number of days", raw),
                )
            })?,
            None => DEFAULT_TOKEN_TTL_DAYS,
        };
        let token_ttl = match ttl_days {
            0 => None,
            days => Some(Duration::try_days(days).ok_or_else(|| {
                ConfigError::InvalidValue("BRAINLY_TOKEN_TTL_DAYS".into(), "out of range".into())
            })?),
        };

        let cors_origin = var("BRAINLY_CORS_ORIGIN").filter(|s| !s.is_empty());

        Ok(Self {
            bind_address,
            db_path,
            jwt_secret,
            token_ttl,
            cors_origin,
        })
    }

    pub fn auth(&self) -> AuthConfig {
        AuthConfig {
            jwt_secret: self.jwt_secret.clone(),
            token_ttl: self.token_ttl,
        }
    }
}
