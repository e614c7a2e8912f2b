// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{ApiKeyVerifier, SessionTokenCache};
use crate::backend::PocketBaseClient;
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub backend: PocketBaseClient,
    pub sessions: SessionTokenCache,
    pub verifier: Arc<ApiKeyVerifier>,
}

impl AppState {
    pub fn new(backend: PocketBaseClient, sessions: SessionTokenCache, verifier: ApiKeyVerifier) -> Self {
        Self {
            backend,
            sessions,
            verifier: Arc::new(verifier),
        }
    }

    /// Build the client, the shared session cache and the verifier from config.
    pub fn from_config(config: &Config) -> Result<Self, crate::backend::BackendError> {
        let backend = PocketBaseClient::from_config(&config.backend)?;
        let sessions = SessionTokenCache::new(
            backend.clone(),
            config.backend.admin.clone(),
            config.session_renew_interval,
        );
        let verifier = ApiKeyVerifier::new(
            backend.clone(),
            sessions.clone(),
            config.lookup,
            config.key_prefix_len,
        )
        .with_verification_limit(config.verify_concurrency);
        Ok(Self::new(backend, sessions, verifier))
    }
}
