// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! API key authentication backed by the PocketBase `api_keys` collection.
//!
//! ## Auth Flow
//!
//! 1. Client sends `Authorization: Bearer <api key>`
//! 2. [`middleware::require_api_key`] hands the header to [`ApiKeyVerifier`]
//! 3. The verifier:
//!    - Obtains an admin session token from [`SessionTokenCache`]
//!    - Lists candidate key records
//!    - bcrypt-verifies the presented key against each hash
//! 4. The owning account id is inserted into request extensions and read by
//!    handlers through the [`Account`] extractor
//!
//! ## Security
//!
//! - Presented keys and session tokens are never logged
//! - Every failure is reported as the same `401 {"error":"Unauthorized"}`
//! - Stored hashes are only ever compared through bcrypt

pub mod error;
pub mod extractor;
pub mod keys;
pub mod middleware;
pub mod session;
pub mod verifier;

pub use error::AuthError;
pub use extractor::Account;
pub use session::SessionTokenCache;
pub use verifier::{ApiKeyVerifier, LookupStrategy};
