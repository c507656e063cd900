//! Application configuration
//!
//! Central location for configuration constants, storage keys and
//! the environment-driven runtime configuration.

use std::env;

// ===== Environment =====

/// Connection string for the relational store. Absent means "unconfigured".
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
/// Address the function host binds to
pub const BIND_ADDR_ENV: &str = "HORTA_BIND_ADDR";
/// Username accepted by the `/auth` handler
pub const ADMIN_USERNAME_ENV: &str = "HORTA_ADMIN_USERNAME";
/// Password accepted by the `/auth` handler
pub const ADMIN_PASSWORD_ENV: &str = "HORTA_ADMIN_PASSWORD";

/// Default bind address for the function host
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8888";

// ===== Identity =====

/// Author recorded on every post. There is a single tenant.
pub const POST_AUTHOR: &str = "admin";

/// Credential pair accepted by the client when remote auth is unreachable,
/// and the server-side default when no credential is configured.
pub const FALLBACK_USERNAME: &str = "admin";
pub const FALLBACK_PASSWORD: &str = "admin123";

// ===== Local Storage Keys =====

/// Key holding the full posts array as one JSON blob
pub const POSTS_STORAGE_KEY: &str = "hortaPosts";
/// Key holding the bearer token
pub const TOKEN_STORAGE_KEY: &str = "adminToken";

// ===== HTTP =====

pub const CORS_ALLOW_ORIGIN: &str = "*";
pub const CORS_ALLOW_HEADERS: &str = "Content-Type, Authorization";
pub const CORS_ALLOW_METHODS: &str = "GET, POST, PUT, DELETE";

/// Largest request body the function host accepts (base64 images included)
pub const MAX_REQUEST_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Maximum stored filename length for uploaded images
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Runtime configuration read from the environment
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub admin_username: String,
    pub admin_password: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var(DATABASE_URL_ENV)
                .ok()
                .filter(|url| !url.trim().is_empty()),
            bind_addr: env::var(BIND_ADDR_ENV).unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            admin_username: env::var(ADMIN_USERNAME_ENV)
                .unwrap_or_else(|_| FALLBACK_USERNAME.to_string()),
            admin_password: env::var(ADMIN_PASSWORD_ENV)
                .unwrap_or_else(|_| FALLBACK_PASSWORD.to_string()),
        }
    }

    /// Configuration backed by the given database, defaults elsewhere
    pub fn with_database(database_url: impl Into<String>) -> Self {
        Self {
            database_url: Some(database_url.into()),
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            admin_username: FALLBACK_USERNAME.to_string(),
            admin_password: FALLBACK_PASSWORD.to_string(),
        }
    }
}
