// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # PocketBase Record Client
//!
//! Stateless request/response translation for the backend record store.
//!
//! ## Endpoints
//!
//! - `POST {base}/api/admins/auth-with-password` → admin session token
//! - `GET  {base}/api/collections/{collection}/records?filter=<expr>` → `{"items": [...]}`
//!
//! ## Behaviour
//!
//! - Every response body is read to completion before returning, on success
//!   and on error, so pooled connections are always released.
//! - Nothing here retries. Callers decide what a failure means.
//! - The session token is sent raw in `Authorization`, which is what PocketBase
//!   expects for admin tokens.

pub mod filter;
pub mod records;

#[cfg(test)]
pub(crate) mod fake;

use std::fmt;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{AdminCredentials, BackendConfig};

pub use filter::Filter;
pub use records::{ApiKeyRecord, UserRecord, API_KEYS_COLLECTION, CONTENT_COLLECTION, USERS_COLLECTION};

const AUTH_PATH: &str = "/api/admins/auth-with-password";

/// PocketBase caps `perPage` at 500.
const PAGE_SIZE: u32 = 500;

/// Errors from talking to the backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("{endpoint} returned unexpected status {status}")]
    UnexpectedStatus { endpoint: String, status: StatusCode },

    #[error("response from {endpoint} could not be decoded: {message}")]
    Decode { endpoint: String, message: String },
}

impl BackendError {
    /// HTTP status returned by the backend, if the failure was a status error.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            BackendError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Privileged admin session token. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// Records returned by a query. Consumed once, in backend order.
#[derive(Debug)]
pub struct Records<T> {
    inner: std::vec::IntoIter<T>,
}

impl<T> Records<T> {
    fn new(items: Vec<T>) -> Self {
        Self {
            inner: items.into_iter(),
        }
    }
}

impl<T> Iterator for Records<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for Records<T> {}

#[derive(Serialize)]
struct AuthRequest<'a> {
    identity: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct AuthResponse {
    token: String,
}

/// The echoed `page` field is ignored; the client tracks its own position.
#[derive(Deserialize)]
struct ListPage<T> {
    items: Vec<T>,
    #[serde(default = "first_page", rename = "totalPages")]
    total_pages: u32,
}

fn first_page() -> u32 {
    1
}

/// HTTP client for the PocketBase REST API.
#[derive(Debug, Clone)]
pub struct PocketBaseClient {
    base_url: String,
    http: Client,
}

impl PocketBaseClient {
    /// Create a client. `base_url` must already be normalized (no trailing `/`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let base_url = base_url.into();
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport {
                endpoint: base_url.clone(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { base_url, http })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        Self::new(config.base_url.clone(), config.request_timeout)
    }

    /// Exchange admin credentials for a session token.
    pub async fn auth_with_password(
        &self,
        admin: &AdminCredentials,
    ) -> Result<SessionToken, BackendError> {
        let endpoint = format!("{}{AUTH_PATH}", self.base_url);
        let response = self
            .http
            .post(&endpoint)
            .json(&AuthRequest {
                identity: &admin.identity,
                password: &admin.password,
            })
            .send()
            .await
            .map_err(|e| transport(&endpoint, e))?;

        let body: AuthResponse = read_json(&endpoint, response).await?;
        if body.token.trim().is_empty() {
            return Err(BackendError::Decode {
                endpoint,
                message: "response did not include a token".to_string(),
            });
        }
        Ok(SessionToken(body.token))
    }

    /// List every record of `collection` matching `filter`, following pages.
    pub async fn list_records<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: &Filter,
        token: &SessionToken,
    ) -> Result<Records<T>, BackendError> {
        let endpoint = format!("{}/api/collections/{collection}/records", self.base_url);
        let filter_expr = filter.to_string();
        let mut items = Vec::new();
        let mut page = 1u32;

        loop {
            let mut query = vec![
                ("page", page.to_string()),
                ("perPage", PAGE_SIZE.to_string()),
            ];
            if !filter.is_empty() {
                query.push(("filter", filter_expr.clone()));
            }

            let response = self
                .http
                .get(&endpoint)
                .header(reqwest::header::AUTHORIZATION, token.expose())
                .query(&query)
                .send()
                .await
                .map_err(|e| transport(&endpoint, e))?;

            let body: ListPage<T> = read_json(&endpoint, response).await?;
            let fetched = body.items.len();
            items.extend(body.items);

            if fetched == 0 || page >= body.total_pages {
                break;
            }
            page += 1;
        }

        debug!(collection, count = items.len(), "backend records listed");
        Ok(Records::new(items))
    }
}

fn transport(endpoint: &str, e: reqwest::Error) -> BackendError {
    BackendError::Transport {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    }
}

/// Drain the body, then check the status and decode.
async fn read_json<T: DeserializeOwned>(
    endpoint: &str,
    response: Response,
) -> Result<T, BackendError> {
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| transport(endpoint, e))?;

    if !status.is_success() {
        debug!(endpoint, %status, body_len = bytes.len(), "backend returned error status");
        return Err(BackendError::UnexpectedStatus {
            endpoint: endpoint.to_string(),
            status,
        });
    }

    serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}
