// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::backend::BackendError;

/// Authentication error type.
///
/// Variants keep the real cause for logging. The HTTP response is identical
/// for all of them so a caller cannot tell a wrong key from an unknown
/// account or a backend outage.
#[derive(Debug)]
pub enum AuthError {
    /// No API key in the request
    MissingKey,
    /// Candidate keys exist but none verified
    InvalidKey,
    /// The lookup returned no candidate keys
    AccountNotFound,
    /// Admin session could not be acquired
    AuthenticationFailure(BackendError),
    /// Backend query failed
    Backend(BackendError),
    /// Internal error
    InternalError(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: &'static str,
}

impl AuthError {
    /// Stable code for logs. Never sent to clients.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingKey => "missing_key",
            AuthError::InvalidKey => "invalid_key",
            AuthError::AccountNotFound => "account_not_found",
            AuthError::AuthenticationFailure(_) => "authentication_failure",
            AuthError::Backend(_) => "backend_error",
            AuthError::InternalError(_) => "internal_error",
        }
    }

    /// Every auth failure is reported as 401.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingKey => write!(f, "API key is required"),
            AuthError::InvalidKey => write!(f, "API key did not match any stored key"),
            AuthError::AccountNotFound => write!(f, "No API keys found for lookup"),
            AuthError::AuthenticationFailure(e) => {
                write!(f, "Admin session could not be acquired: {e}")
            }
            AuthError::Backend(e) => write!(f, "Backend lookup failed: {e}"),
            AuthError::InternalError(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuthError::AuthenticationFailure(e) | AuthError::Backend(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BackendError> for AuthError {
    fn from(e: BackendError) -> Self {
        AuthError::Backend(e)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(AuthErrorBody {
            error: "Unauthorized",
        });
        (self.status_code(), body).into_response()
    }
}
