// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for the account resolved by the API key gate.
//!
//! ```rust,ignore
//! async fn my_handler(Account(account): Account) -> impl IntoResponse {
//!     // account is AccountId
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;
use crate::models::AccountId;

/// Account attached by [`require_api_key`](super::middleware::require_api_key).
///
/// Rejects with `403 Access denied` when the gate did not run for the route.
pub struct Account(pub AccountId);

impl<S> FromRequestParts<S> for Account
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AccountId>()
            .cloned()
            .map(Account)
            .ok_or_else(|| ApiError::forbidden("Access denied"))
    }
}
