// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Record shapes returned by the PocketBase collections this service reads.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::models::AccountId;

pub const API_KEYS_COLLECTION: &str = "api_keys";
pub const USERS_COLLECTION: &str = "users";
pub const CONTENT_COLLECTION: &str = "example_content";

/// A stored API key. `key` holds a bcrypt hash, never the raw key.
#[derive(Clone, Deserialize)]
pub struct ApiKeyRecord {
    pub id: String,
    pub account: AccountId,
    #[serde(rename = "key")]
    pub key_hash: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "pb_datetime")]
    pub revoked: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "pb_datetime")]
    pub last_used: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "pb_datetime")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "pb_datetime")]
    pub updated: Option<DateTime<Utc>>,
}

impl ApiKeyRecord {
    /// A key counts as revoked once its revocation date has passed.
    pub fn is_revoked_at(&self, now: DateTime<Utc>) -> bool {
        self.revoked.is_some_and(|at| at <= now)
    }
}

// Keeps the hash out of logs.
impl std::fmt::Debug for ApiKeyRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyRecord")
            .field("id", &self.id)
            .field("account", &self.account)
            .field("name", &self.name)
            .field("revoked", &self.revoked)
            .finish_non_exhaustive()
    }
}

/// Subset of the `users` auth collection.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub id: AccountId,
    #[serde(default)]
    pub email: Option<String>,
}

/// PocketBase serializes dates as `2024-10-21 12:21:22.441Z` and unset dates
/// as the empty string.
fn pb_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(raw.trim_end_matches('Z'), "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| Some(naive.and_utc()))
        .map_err(serde::de::Error::custom)
}
