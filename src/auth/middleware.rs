// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! API key gate for Axum.
//!
//! Apply to a router subtree with
//! `axum::middleware::from_fn_with_state(state, require_api_key)`. On success
//! the resolved [`AccountId`](crate::models::AccountId) is inserted into the
//! request extensions; on any failure the request is answered with
//! `401 {"error":"Unauthorized"}` and the inner handler never runs.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, info, warn};

use super::AuthError;
use crate::state::AppState;

/// Header naming the caller's account for e-mail based key lookup.
pub const ACCOUNT_EMAIL_HEADER: &str = "x-account-email";

/// Authentication middleware function.
pub async fn require_api_key(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(authorization) = header_value(request.headers(), AUTHORIZATION.as_str()) else {
        debug!("Request without API key rejected");
        return AuthError::MissingKey.into_response();
    };
    let account_email = header_value(request.headers(), ACCOUNT_EMAIL_HEADER);

    match state
        .verifier
        .resolve_account(&authorization, account_email.as_deref())
        .await
    {
        Ok(account) => {
            debug!(account = %account, "API key accepted");
            request.extensions_mut().insert(account);
            next.run(request).await
        }
        Err(e) => {
            match &e {
                AuthError::InvalidKey | AuthError::AccountNotFound | AuthError::MissingKey => {
                    info!(reason = e.error_code(), "API key rejected");
                }
                _ => {
                    warn!(reason = e.error_code(), error = %e, "API key could not be verified");
                }
            }
            e.into_response()
        }
    }
}

/// Non-empty UTF-8 header value, untrimmed so positional prefixes stay aligned.
fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::router;
    use crate::backend::fake::FakeBackend;
    use crate::state::tests::test_state;
    use axum::{body::Body, body::to_bytes, http::Request as HttpRequest, http::StatusCode};
    use tower::ServiceExt;

    async fn call(
        backend: &FakeBackend,
        headers: &[(&str, &str)],
    ) -> (StatusCode, serde_json::Value) {
        let app = router(test_state(backend));
        let mut builder = HttpRequest::builder().uri("/api/content");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn backend() -> crate::backend::fake::FakeBackendBuilder {
        FakeBackend::builder()
            .admin("admin@example.com", "secret")
            .user("acct_42", "owner@example.com")
            .api_key("k1", "acct_42", "sk_live_abc123")
            .content("acct_42", "c1", "Quarterly report")
    }

    #[tokio::test]
    async fn missing_header_short_circuits() {
        let backend = backend().start().await;
        let (status, body) = call(&backend, &[]).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Unauthorized");
        assert_eq!(backend.auth_calls(), 0);
    }

    #[tokio::test]
    async fn blank_header_short_circuits() {
        let backend = backend().start().await;
        let (status, _) = call(&backend, &[("authorization", "   ")]).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(backend.auth_calls(), 0);
    }

    #[tokio::test]
    async fn valid_key_reaches_handler_with_account() {
        let backend = backend().start().await;
        let (status, body) = call(
            &backend,
            &[
                ("authorization", "Bearer sk_live_abc123"),
                (ACCOUNT_EMAIL_HEADER, "owner@example.com"),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["content"][0]["id"], "c1");
    }

    #[tokio::test]
    async fn wrong_key_is_unauthorized() {
        let backend = backend().start().await;
        let (status, body) = call(
            &backend,
            &[
                ("authorization", "Bearer sk_live_wrong"),
                (ACCOUNT_EMAIL_HEADER, "owner@example.com"),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, serde_json::json!({ "error": "Unauthorized" }));
    }

    #[tokio::test]
    async fn unknown_account_email_is_unauthorized() {
        let backend = backend().start().await;
        let (status, body) = call(
            &backend,
            &[
                ("authorization", "Bearer sk_live_abc123"),
                (ACCOUNT_EMAIL_HEADER, "nobody@example.com"),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, serde_json::json!({ "error": "Unauthorized" }));
    }

    #[tokio::test]
    async fn empty_key_collection_is_unauthorized() {
        let backend = FakeBackend::builder()
            .admin("admin@example.com", "secret")
            .start()
            .await;
        let (status, body) = call(&backend, &[("authorization", "Bearer sk_live_abc123")]).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, serde_json::json!({ "error": "Unauthorized" }));
    }

    #[tokio::test]
    async fn backend_session_failure_is_unauthorized() {
        let backend = backend().failing_auth().start().await;
        let (status, body) = call(&backend, &[("authorization", "Bearer sk_live_abc123")]).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, serde_json::json!({ "error": "Unauthorized" }));
        // The content query never ran.
        assert_eq!(backend.list_calls(), 0);
    }
}
