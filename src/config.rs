use anyhow::{Context, Result, anyhow, bail};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    MySql,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" => Ok(StoreBackend::MySql),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(anyhow!("unknown STORE_BACKEND '{other}' (expected mysql or memory)")),
        }
    }
}

/// Process-wide settings, resolved once at start-up.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: String,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub access_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    /// CORS allow-list; empty means same-origin only.
    pub allowed_origins: Vec<String>,
    /// Base URL the dashboard should call, served from `/client-config`.
    pub api_base_url: String,

    pub log_dir: String,
    pub max_upload_bytes: usize,

    /// Seed admin account, created at start-up when both are set.
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| lookup(key).with_context(|| format!("{key} must be set"));
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
        where
            T: FromStr,
            T::Err: std::fmt::Display,
        {
            match value {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|e| anyhow!("{key} is invalid: {e}")),
                None => Ok(default),
            }
        }

        let store_backend = parse_or(optional("STORE_BACKEND"), "STORE_BACKEND", StoreBackend::MySql)?;
        let database_url = optional("DATABASE_URL");
        if store_backend == StoreBackend::MySql && database_url.is_none() {
            bail!("DATABASE_URL must be set when STORE_BACKEND is mysql");
        }

        let allowed_origins = optional("ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|o| o.trim().trim_end_matches('/').to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            store_backend,
            database_url,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parse_or(optional("ACCESS_TOKEN_TTL"), "ACCESS_TOKEN_TTL", 3600)?,

            rate_login_per_min: parse_or(optional("RATE_LOGIN_PER_MIN"), "RATE_LOGIN_PER_MIN", 60)?,
            rate_protected_per_min: parse_or(
                optional("RATE_PROTECTED_PER_MIN"),
                "RATE_PROTECTED_PER_MIN",
                1000,
            )?,

            api_prefix: optional("API_PREFIX").unwrap_or_else(|| "/api".to_string()),
            allowed_origins,
            api_base_url: optional("API_BASE_URL")
                .unwrap_or_else(|| "http://localhost:8000/api".to_string()),

            log_dir: optional("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
            max_upload_bytes: parse_or(
                optional("MAX_UPLOAD_BYTES"),
                "MAX_UPLOAD_BYTES",
                10 * 1024 * 1024,
            )?,

            admin_username: optional("ADMIN_USERNAME"),
            admin_password: optional("ADMIN_PASSWORD"),
        })
    }
}
