//! Runtime configuration loaded from environment variables
//!
//! `main` loads a `.env` file with dotenvy before calling [`Config::from_env`].

use std::env;
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATABASE: &str = "data.db";
const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";
const DEFAULT_PAYCHANGU_URL: &str = "https://api.paychangu.com";
const DEFAULT_UPLOAD_LIMIT: usize = 5 * 1024 * 1024;

/// Token lifetimes accepted from `JWT_EXPIRY_DAYS`
const JWT_EXPIRY_DAYS: RangeInclusive<i64> = 1..=3650;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Administrator account created at startup when it does not exist yet
#[derive(Clone, Debug)]
pub struct AdminSeed {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_path: String,

    pub jwt_secret: String,
    pub jwt_expiry_days: i64,

    /// Base URL of the SPA; payment callbacks land on `{frontend_url}/order-success/{id}`
    pub frontend_url: String,
    /// Base URL this server is reachable at, used to build upload URLs
    pub public_url: String,

    pub paychangu_base_url: String,
    pub paychangu_secret_key: String,
    /// Shared secret for webhook signatures. Webhooks are rejected while unset.
    pub paychangu_webhook_secret: Option<String>,
    pub paychangu_timeout_secs: u64,
    pub currency: String,
    pub shop_name: String,

    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,

    pub admin_seed: Option<AdminSeed>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = parse_or("PORT", DEFAULT_PORT)?;
        let public_url = optional("PUBLIC_URL")
            .unwrap_or_else(|| format!("http://localhost:{}", port));

        let admin_seed = match (optional("ADMIN_EMAIL"), optional("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed {
                name: optional("ADMIN_NAME").unwrap_or_else(|| "Administrator".to_string()),
                email,
                password,
                phone: optional("ADMIN_PHONE"),
            }),
            _ => None,
        };

        Ok(Self {
            port,
            database_path: optional("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiry_days: within(
                "JWT_EXPIRY_DAYS",
                parse_or("JWT_EXPIRY_DAYS", 30)?,
                JWT_EXPIRY_DAYS,
            )?,
            frontend_url: trim_slash(
                optional("FRONTEND_URL").unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string()),
            ),
            public_url: trim_slash(public_url),
            paychangu_base_url: trim_slash(
                optional("PAYCHANGU_BASE_URL").unwrap_or_else(|| DEFAULT_PAYCHANGU_URL.to_string()),
            ),
            paychangu_secret_key: required("PAYCHANGU_SECRET_KEY")?,
            paychangu_webhook_secret: optional("PAYCHANGU_WEBHOOK_SECRET"),
            paychangu_timeout_secs: parse_or("PAYCHANGU_TIMEOUT_SECS", 30)?,
            currency: optional("CURRENCY").unwrap_or_else(|| "MWK".to_string()),
            shop_name: optional("SHOP_NAME").unwrap_or_else(|| "Storefront".to_string()),
            upload_dir: PathBuf::from(optional("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string())),
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", DEFAULT_UPLOAD_LIMIT)?,
            admin_seed,
        })
    }
}

/// Reads a variable, treating empty values as unset
fn optional(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

fn within<T>(name: &'static str, value: T, range: RangeInclusive<T>) -> Result<T, ConfigError>
where
    T: PartialOrd + Display,
{
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid { name, value: value.to_string() })
    }
}

fn trim_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
