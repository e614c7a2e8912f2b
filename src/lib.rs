// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Keygate - API key gateway in front of a PocketBase backend
//!
//! Callers present an API key; the service verifies it against bcrypt hashes
//! stored in PocketBase, resolves the owning account and serves that
//! account's content. Backend access uses a cached, periodically renewed
//! admin session.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Admin session cache, API key verification and the request gate
//! - `backend` - PocketBase REST client
//! - `config` - Environment configuration

pub mod api;
pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
