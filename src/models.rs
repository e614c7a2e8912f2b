// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Types shared between the auth layer and the HTTP handlers. All public
//! response types derive `Serialize` and `ToSchema` for JSON handling and
//! OpenAPI documentation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
// Account Identifier
// =============================================================================

/// Opaque account (tenant) identifier resolved from a verified API key.
///
/// The auth gate stores it in request extensions; handlers read it through
/// the [`Account`](crate::auth::Account) extractor.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AccountId {
    fn from(value: String) -> Self {
        AccountId(value)
    }
}

impl From<&str> for AccountId {
    fn from(value: &str) -> Self {
        AccountId(value.to_string())
    }
}

// =============================================================================
// Content Models
// =============================================================================

/// A content record owned by an account (`example_content` collection).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub updated: String,
}

/// Response body for `GET /api/content`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ContentResponse {
    pub content: Vec<ContentItem>,
}
