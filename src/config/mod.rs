//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::util::rate_limit::WRITE_RATE_LIMIT;

/// Where item rows are stored
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Supabase(SupabaseConfig),
    /// Process-local tables, lost on restart
    Memory,
}

/// Supabase connection settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SupabaseConfig {
    /// Supabase project URL
    pub url: String,
    /// Supabase service role key (bypasses RLS - server only!)
    pub service_role_key: String,
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    pub store: StoreBackend,
    /// Supabase JWT secret for token verification
    pub supabase_jwt_secret: String,

    /// Allowed client origins for CORS, `*` for any
    pub client_origin: String,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Writes allowed per user per second
    pub write_rate_limit: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));

        // Render provides PORT env var, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let store = match lookup("STORE_BACKEND").as_deref().unwrap_or("supabase") {
            "supabase" => StoreBackend::Supabase(SupabaseConfig {
                url: required("SUPABASE_URL")?,
                service_role_key: required("SUPABASE_SERVICE_ROLE_KEY")?,
            }),
            "memory" => StoreBackend::Memory,
            other => return Err(ConfigError::InvalidBackend(other.to_string())),
        };

        let request_timeout = match lookup("REQUEST_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(
                v.parse()
                    .map_err(|_| ConfigError::InvalidNumber("REQUEST_TIMEOUT_SECS"))?,
            ),
            None => Duration::from_secs(10),
        };

        let write_rate_limit = match lookup("WRITE_RATE_LIMIT") {
            Some(v) => v
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("WRITE_RATE_LIMIT"))?,
            None => WRITE_RATE_LIMIT,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            store,
            supabase_jwt_secret: required("SUPABASE_JWT_SECRET")?,

            client_origin: lookup("CLIENT_ORIGIN").unwrap_or_else(|| "*".to_string()),
            request_timeout,
            write_rate_limit,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Unknown STORE_BACKEND '{0}' (expected 'supabase' or 'memory')")]
    InvalidBackend(String),

    #[error("Environment variable {0} must be a non-negative integer")]
    InvalidNumber(&'static str),
}
