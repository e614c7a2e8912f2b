// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin session token cache.
//!
//! ## Behaviour
//!
//! - The first caller authenticates against the backend while holding the slot
//!   lock. Concurrent first callers wait on the lock and then read the cached
//!   token, so at most one authentication is ever in flight.
//! - Reads of a held token never touch the network and never check validity.
//! - The first successful acquisition spawns one renewal task. Every
//!   `renew_interval` it re-authenticates outside the lock and swaps the token
//!   in. A failed renewal is logged and ends the task; readers keep getting the
//!   previous token.
//! - [`SessionTokenCache::shutdown`] cancels the renewal task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::error::AuthError;
use crate::backend::{PocketBaseClient, SessionToken};
use crate::config::AdminCredentials;

struct Inner {
    client: PocketBaseClient,
    admin: AdminCredentials,
    renew_interval: Duration,
    slot: Mutex<Option<SessionToken>>,
    renewal: std::sync::Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

/// Shared admin session token. Cloning shares the same slot.
#[derive(Clone)]
pub struct SessionTokenCache {
    inner: Arc<Inner>,
}

impl SessionTokenCache {
    pub fn new(client: PocketBaseClient, admin: AdminCredentials, renew_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                admin,
                renew_interval,
                slot: Mutex::new(None),
                renewal: std::sync::Mutex::new(None),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Return the held token, authenticating first if none is held.
    pub async fn get_token(&self) -> Result<SessionToken, AuthError> {
        let mut slot = self.inner.slot.lock().await;
        if let Some(token) = slot.as_ref() {
            return Ok(token.clone());
        }

        let token = self
            .inner
            .client
            .auth_with_password(&self.inner.admin)
            .await
            .map_err(AuthError::AuthenticationFailure)?;
        *slot = Some(token.clone());
        drop(slot);

        info!(
            renew_in_secs = self.inner.renew_interval.as_secs(),
            "Admin session acquired"
        );
        self.schedule_renewal();
        Ok(token)
    }

    /// Whether a token is currently held.
    pub async fn has_token(&self) -> bool {
        self.inner.slot.lock().await.is_some()
    }

    /// Whether the renewal task is still alive.
    pub fn renewal_running(&self) -> bool {
        self.inner
            .renewal
            .lock()
            .map(|handle| handle.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Stop the renewal task and wait for it to exit.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        let handle = self
            .inner
            .renewal
            .lock()
            .ok()
            .and_then(|mut handle| handle.take());
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    fn schedule_renewal(&self) {
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(inner.renew_loop());
        if let Ok(mut slot) = self.inner.renewal.lock() {
            *slot = Some(handle);
        }
    }
}

impl Inner {
    async fn renew_loop(self: Arc<Self>) {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.renew_interval) => {},
                _ = self.shutdown.cancelled() => {
                    debug!("Admin session renewal stopped");
                    return;
                }
            }

            let result = tokio::select! {
                result = self.client.auth_with_password(&self.admin) => result,
                _ = self.shutdown.cancelled() => {
                    debug!("Admin session renewal stopped");
                    return;
                }
            };

            match result {
                Ok(token) => {
                    *self.slot.lock().await = Some(token);
                    info!("Admin session renewed");
                }
                Err(e) => {
                    error!(
                        error = %e,
                        "Admin session renewal failed, keeping previous token"
                    );
                    return;
                }
            }
        }
    }
}
