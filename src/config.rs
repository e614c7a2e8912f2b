// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup and handed to
//! the components that need it. Nothing re-reads the environment afterwards.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `POCKETBASE_URL` | Backend base URL | Required |
//! | `POCKETBASE_EMAIL` | Admin identity used for session acquisition | Required |
//! | `POCKETBASE_PASSWORD` | Admin password used for session acquisition | Required |
//! | `API_KEY_PREFIX` | Scheme tag in front of the key (only its length is used) | `Bearer ` |
//! | `API_KEY_LOOKUP` | Candidate lookup strategy (`email` or `scan`) | `email` |
//! | `API_KEY_VERIFY_CONCURRENCY` | bcrypt verifications allowed to run at once | `8` |
//! | `SESSION_RENEW_SECS` | Interval between admin session renewals | `86400` |
//! | `BACKEND_TIMEOUT_SECS` | Timeout applied to every backend request | `10` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use url::Url;

use crate::auth::LookupStrategy;

pub const POCKETBASE_URL_ENV: &str = "POCKETBASE_URL";
pub const POCKETBASE_EMAIL_ENV: &str = "POCKETBASE_EMAIL";
pub const POCKETBASE_PASSWORD_ENV: &str = "POCKETBASE_PASSWORD";
pub const API_KEY_PREFIX_ENV: &str = "API_KEY_PREFIX";
pub const API_KEY_LOOKUP_ENV: &str = "API_KEY_LOOKUP";
pub const API_KEY_VERIFY_CONCURRENCY_ENV: &str = "API_KEY_VERIFY_CONCURRENCY";
pub const SESSION_RENEW_SECS_ENV: &str = "SESSION_RENEW_SECS";
pub const BACKEND_TIMEOUT_SECS_ENV: &str = "BACKEND_TIMEOUT_SECS";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Scheme tag the deployment puts in front of API keys.
pub const DEFAULT_KEY_PREFIX: &str = "Bearer ";

/// Presumed lifetime of a PocketBase admin token.
pub const DEFAULT_SESSION_RENEW_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_VERIFY_CONCURRENCY: usize = 8;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Admin credentials for the backend. The password never appears in `Debug`.
#[derive(Clone)]
pub struct AdminCredentials {
    pub identity: String,
    pub password: String,
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("identity", &self.identity)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything needed to talk to the PocketBase backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL without a trailing slash.
    pub base_url: String,
    pub admin: AdminCredentials,
    pub request_timeout: Duration,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendConfig,
    /// Number of leading header characters dropped before verification.
    pub key_prefix_len: usize,
    pub lookup: LookupStrategy,
    /// Upper bound on bcrypt verifications running on the blocking pool.
    pub verify_concurrency: usize,
    pub session_renew_interval: Duration,
    pub bind_addr: SocketAddr,
    pub log_format: LogFormat,
}

impl Config {
    /// Load the full configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |name: &'static str| var(name).ok_or(ConfigError::Missing(name));

        let base_url = normalize_base_url(&required(POCKETBASE_URL_ENV)?)?;
        let admin = AdminCredentials {
            identity: required(POCKETBASE_EMAIL_ENV)?,
            password: required(POCKETBASE_PASSWORD_ENV)?,
        };

        // Trimming would eat the space in "Bearer ", so the prefix is read raw.
        let key_prefix_len = lookup(API_KEY_PREFIX_ENV)
            .unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string())
            .len();

        let lookup_strategy = match var(API_KEY_LOOKUP_ENV) {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                name: API_KEY_LOOKUP_ENV,
                reason,
            })?,
            None => LookupStrategy::default(),
        };

        let verify_concurrency = match var(API_KEY_VERIFY_CONCURRENCY_ENV) {
            Some(raw) => match raw.parse::<usize>() {
                Ok(0) => {
                    return Err(ConfigError::Invalid {
                        name: API_KEY_VERIFY_CONCURRENCY_ENV,
                        reason: "must be greater than zero".to_string(),
                    })
                }
                Ok(n) => n,
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        name: API_KEY_VERIFY_CONCURRENCY_ENV,
                        reason: e.to_string(),
                    })
                }
            },
            None => DEFAULT_VERIFY_CONCURRENCY,
        };

        let session_renew_interval = parse_secs(SESSION_RENEW_SECS_ENV, var(SESSION_RENEW_SECS_ENV))?
            .unwrap_or(DEFAULT_SESSION_RENEW_INTERVAL);
        let request_timeout = parse_secs(BACKEND_TIMEOUT_SECS_ENV, var(BACKEND_TIMEOUT_SECS_ENV))?
            .unwrap_or(DEFAULT_BACKEND_TIMEOUT);

        let host = var(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match var(PORT_ENV) {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: PORT_ENV,
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };
        let bind_addr: SocketAddr =
            format!("{host}:{port}")
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                    name: HOST_ENV,
                    reason: e.to_string(),
                })?;

        let log_format = match var(LOG_FORMAT_ENV).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            backend: BackendConfig {
                base_url,
                admin,
                request_timeout,
            },
            key_prefix_len,
            lookup: lookup_strategy,
            verify_concurrency,
            session_renew_interval,
            bind_addr,
            log_format,
        })
    }
}

/// Validate the base URL and strip trailing slashes so paths can be appended.
pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed).map_err(|e| ConfigError::Invalid {
        name: POCKETBASE_URL_ENV,
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid {
            name: POCKETBASE_URL_ENV,
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(trimmed.to_string())
}

fn parse_secs(name: &'static str, raw: Option<String>) -> Result<Option<Duration>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let secs: u64 = raw.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            name,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Some(Duration::from_secs(secs)))
}
