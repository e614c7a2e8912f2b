// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account-scoped content endpoint.

use axum::{extract::State, Json};
use tracing::{debug, error};

use crate::{
    auth::Account,
    backend::{Filter, CONTENT_COLLECTION},
    error::ApiError,
    models::{ContentItem, ContentResponse},
    state::AppState,
};

const FETCH_FAILED: &str = "Failed to fetch content";

/// List the content records owned by the caller's account.
#[utoipa::path(
    get,
    path = "/api/content",
    tag = "Content",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Content for the authenticated account", body = ContentResponse),
        (status = 401, description = "Unauthorized - missing or invalid API key"),
        (status = 403, description = "No account attached to the request"),
        (status = 500, description = "Content could not be fetched"),
    )
)]
pub async fn get_content(
    State(state): State<AppState>,
    Account(account): Account,
) -> Result<Json<ContentResponse>, ApiError> {
    let token = state.sessions.get_token().await.map_err(|e| {
        error!(account = %account, error = %e, "Admin session unavailable for content fetch");
        ApiError::internal(FETCH_FAILED)
    })?;

    let content: Vec<ContentItem> = state
        .backend
        .list_records(
            CONTENT_COLLECTION,
            &Filter::eq("account", account.as_str()),
            &token,
        )
        .await
        .map_err(|e| {
            error!(account = %account, error = %e, "Content fetch failed");
            ApiError::internal(FETCH_FAILED)
        })?
        .collect();

    debug!(account = %account, items = content.len(), "Content served");
    Ok(Json(ContentResponse { content }))
}
