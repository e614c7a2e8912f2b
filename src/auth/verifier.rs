// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! API key verification.
//!
//! ## Flow
//!
//! 1. Drop the configured scheme prefix from the header value
//! 2. Get the admin session token from [`SessionTokenCache`]
//! 3. Fetch candidate `api_keys` records according to [`LookupStrategy`]
//! 4. bcrypt-verify the presented key against each non-revoked candidate;
//!    the first match yields the owning account
//!
//! Hash comparisons run on the blocking pool, at most
//! `verification_limit` at a time. A lookup that finds no candidates still
//! performs one comparison against a fixed hash, so an unknown account costs
//! the same as a wrong key.

use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::debug;

use super::error::AuthError;
use super::keys::{hash_api_key, strip_scheme, verify_api_key, DEFAULT_BCRYPT_COST};
use super::session::SessionTokenCache;
use crate::backend::{
    ApiKeyRecord, Filter, PocketBaseClient, SessionToken, UserRecord, API_KEYS_COLLECTION,
    USERS_COLLECTION,
};
use crate::config::DEFAULT_VERIFY_CONCURRENCY;
use crate::models::AccountId;

/// Hash compared against when there are no candidates. Never matches a real key.
static UNMATCHED_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_api_key("keygate-unmatched-candidate", DEFAULT_BCRYPT_COST).ok());

/// How candidate key records are located.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LookupStrategy {
    /// The caller names its account by e-mail; only that account's keys are
    /// candidates.
    #[default]
    AccountEmail,
    /// Every key record is a candidate. Each request costs one bcrypt
    /// comparison per stored key, so only suitable for small key sets.
    Scan,
}

impl FromStr for LookupStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scan" => Ok(LookupStrategy::Scan),
            "email" | "account_email" => Ok(LookupStrategy::AccountEmail),
            other => Err(format!("unknown lookup strategy '{other}' (expected 'email' or 'scan')")),
        }
    }
}

/// Resolves presented API keys to account identifiers.
#[derive(Clone)]
pub struct ApiKeyVerifier {
    client: PocketBaseClient,
    sessions: SessionTokenCache,
    strategy: LookupStrategy,
    prefix_len: usize,
    permits: Arc<Semaphore>,
}

impl ApiKeyVerifier {
    pub fn new(
        client: PocketBaseClient,
        sessions: SessionTokenCache,
        strategy: LookupStrategy,
        prefix_len: usize,
    ) -> Self {
        Self {
            client,
            sessions,
            strategy,
            prefix_len,
            permits: Arc::new(Semaphore::new(DEFAULT_VERIFY_CONCURRENCY)),
        }
    }

    /// Cap the number of bcrypt verifications running at once (minimum 1).
    pub fn with_verification_limit(mut self, limit: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(limit.max(1)));
        self
    }

    pub fn strategy(&self) -> LookupStrategy {
        self.strategy
    }

    /// Resolve the account owning the key in `authorization`.
    ///
    /// `account_email` is only consulted by [`LookupStrategy::AccountEmail`].
    pub async fn resolve_account(
        &self,
        authorization: &str,
        account_email: Option<&str>,
    ) -> Result<AccountId, AuthError> {
        let presented = strip_scheme(authorization, self.prefix_len)
            .ok_or(AuthError::InvalidKey)?
            .to_string();

        let token = self.sessions.get_token().await?;
        let now = Utc::now();
        let candidates: Vec<(AccountId, String)> = self
            .candidates(&token, account_email)
            .await?
            .into_iter()
            .filter(|record| !record.is_revoked_at(now))
            .map(|record| (record.account, record.key_hash))
            .collect();

        let found = !candidates.is_empty();
        debug!(candidates = candidates.len(), "Verifying API key");

        let matched = self
            .run_verification(move || first_match(&presented, &candidates, verify_api_key))
            .await?;

        match matched {
            Some(account) => Ok(account),
            None if found => Err(AuthError::InvalidKey),
            None => Err(AuthError::AccountNotFound),
        }
    }

    /// Run `job` on the blocking pool once a verification permit is free.
    async fn run_verification<F, R>(&self, job: F) -> Result<R, AuthError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| AuthError::InternalError(format!("verification limiter closed: {e}")))?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await
        .map_err(|e| AuthError::InternalError(format!("key verification task failed: {e}")))
    }

    /// Candidate records. Empty when the named account does not exist.
    async fn candidates(
        &self,
        token: &SessionToken,
        account_email: Option<&str>,
    ) -> Result<Vec<ApiKeyRecord>, AuthError> {
        let filter = match self.strategy {
            LookupStrategy::Scan => Filter::new(),
            LookupStrategy::AccountEmail => {
                let Some(email) = account_email.map(str::trim).filter(|e| !e.is_empty()) else {
                    return Ok(Vec::new());
                };
                let Some(account) = self.account_by_email(token, email).await? else {
                    return Ok(Vec::new());
                };
                Filter::eq("account", account.as_str())
            }
        };

        Ok(self
            .client
            .list_records::<ApiKeyRecord>(API_KEYS_COLLECTION, &filter, token)
            .await?
            .collect())
    }

    async fn account_by_email(
        &self,
        token: &SessionToken,
        email: &str,
    ) -> Result<Option<AccountId>, AuthError> {
        Ok(self
            .client
            .list_records::<UserRecord>(USERS_COLLECTION, &Filter::eq("email", email), token)
            .await?
            .next()
            .map(|user| user.id))
    }
}

/// First candidate whose hash verifies. With no candidates, `verify` still
/// runs once against [`UNMATCHED_HASH`].
fn first_match<F>(presented: &str, candidates: &[(AccountId, String)], verify: F) -> Option<AccountId>
where
    F: Fn(&str, &str) -> bool,
{
    if candidates.is_empty() {
        if let Some(hash) = UNMATCHED_HASH.as_deref() {
            verify(presented, hash);
        }
        return None;
    }
    candidates
        .iter()
        .find(|(_, hash)| verify(presented, hash))
        .map(|(account, _)| account.clone())
}
