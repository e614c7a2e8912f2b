// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process PocketBase stand-in for tests.
//!
//! Serves the two endpoints this crate uses on `127.0.0.1:0`, understands the
//! equality filters produced by [`Filter`](super::Filter), and counts calls so
//! tests can assert on round-trips.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::auth::keys::hash_api_key;

/// Lowest bcrypt cost, keeps fixture hashing fast.
pub const TEST_BCRYPT_COST: u32 = 4;

const PB_DATE: &str = "2024-10-21 12:21:22.441Z";

struct FakeState {
    admin: Option<(String, String)>,
    auth_delay: Duration,
    page_size: usize,
    malformed_lists: bool,
    stuck_page_number: bool,
    collections: HashMap<String, Vec<Value>>,
    fail_auth: AtomicBool,
    auth_calls: AtomicUsize,
    list_calls: AtomicUsize,
    issued: Mutex<Vec<String>>,
    last_authorization: Mutex<Option<String>>,
}

pub struct FakeBackendBuilder {
    state: FakeState,
}

impl FakeBackendBuilder {
    pub fn admin(mut self, email: &str, password: &str) -> Self {
        self.state.admin = Some((email.to_string(), password.to_string()));
        self
    }

    pub fn api_key(self, id: &str, account: &str, raw_key: &str) -> Self {
        self.api_key_record(id, account, raw_key, "")
    }

    pub fn revoked_api_key(self, id: &str, account: &str, raw_key: &str) -> Self {
        self.api_key_record(id, account, raw_key, "2024-01-01 00:00:00.000Z")
    }

    fn api_key_record(self, id: &str, account: &str, raw_key: &str, revoked: &str) -> Self {
        let hash = hash_api_key(raw_key, TEST_BCRYPT_COST).expect("bcrypt hash");
        self.record(
            "api_keys",
            json!({
                "id": id,
                "collectionName": "api_keys",
                "account": account,
                "name": format!("key {id}"),
                "key": hash,
                "revoked": revoked,
                "last_used": "",
                "created": PB_DATE,
                "updated": PB_DATE,
            }),
        )
    }

    /// Insert an `api_keys` record whose `key` is not a bcrypt hash.
    pub fn raw_api_key_record(self, id: &str, account: &str, key_field: &str) -> Self {
        self.record(
            "api_keys",
            json!({ "id": id, "account": account, "key": key_field, "revoked": "" }),
        )
    }

    pub fn user(self, id: &str, email: &str) -> Self {
        self.record(
            "users",
            json!({ "id": id, "collectionName": "users", "email": email }),
        )
    }

    pub fn content(self, account: &str, id: &str, title: &str) -> Self {
        self.record(
            "example_content",
            json!({
                "id": id,
                "account": account,
                "title": title,
                "description": format!("{title} description"),
                "created": PB_DATE,
                "updated": PB_DATE,
            }),
        )
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.state.page_size = size.max(1);
        self
    }

    pub fn auth_delay(mut self, delay: Duration) -> Self {
        self.state.auth_delay = delay;
        self
    }

    pub fn failing_auth(self) -> Self {
        self.state.fail_auth.store(true, Ordering::SeqCst);
        self
    }

    pub fn malformed_lists(mut self) -> Self {
        self.state.malformed_lists = true;
        self
    }

    /// Always report `"page": 1` whatever page was served.
    pub fn stuck_page_number(mut self) -> Self {
        self.state.stuck_page_number = true;
        self
    }

    fn record(mut self, collection: &str, value: Value) -> Self {
        self.state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(value);
        self
    }

    pub async fn start(self) -> FakeBackend {
        let state = Arc::new(self.state);
        let app = Router::new()
            .route("/api/admins/auth-with-password", post(auth_with_password))
            .route("/api/collections/{collection}/records", get(list_records))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fake backend");
        let addr = listener.local_addr().expect("fake backend addr");
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        FakeBackend {
            base_url: format!("http://{addr}"),
            state,
            handle,
        }
    }
}

pub struct FakeBackend {
    base_url: String,
    state: Arc<FakeState>,
    handle: JoinHandle<()>,
}

impl FakeBackend {
    pub fn builder() -> FakeBackendBuilder {
        FakeBackendBuilder {
            state: FakeState {
                admin: None,
                auth_delay: Duration::ZERO,
                page_size: 30,
                malformed_lists: false,
                stuck_page_number: false,
                collections: HashMap::new(),
                fail_auth: AtomicBool::new(false),
                auth_calls: AtomicUsize::new(0),
                list_calls: AtomicUsize::new(0),
                issued: Mutex::new(Vec::new()),
                last_authorization: Mutex::new(None),
            },
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth_calls(&self) -> usize {
        self.state.auth_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.state.list_calls.load(Ordering::SeqCst)
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.state.last_authorization.lock().unwrap().clone()
    }

    pub fn set_fail_auth(&self, fail: bool) {
        self.state.fail_auth.store(fail, Ordering::SeqCst);
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn auth_with_password(
    State(state): State<Arc<FakeState>>,
    Json(body): Json<Value>,
) -> Response {
    state.auth_calls.fetch_add(1, Ordering::SeqCst);
    if !state.auth_delay.is_zero() {
        tokio::time::sleep(state.auth_delay).await;
    }

    if state.fail_auth.load(Ordering::SeqCst) {
        return error(StatusCode::UNAUTHORIZED, "The request requires valid admin authorization token to be set.");
    }

    let identity = body["identity"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    let accepted = state
        .admin
        .as_ref()
        .is_some_and(|(email, pw)| email == identity && pw == password);
    if !accepted {
        return error(StatusCode::BAD_REQUEST, "Failed to authenticate.");
    }

    let token = {
        let mut issued = state.issued.lock().unwrap();
        let token = format!("token-{}", issued.len() + 1);
        issued.push(token.clone());
        token
    };
    Json(json!({ "token": token, "admin": { "id": "admin1", "email": identity } })).into_response()
}

async fn list_records(
    State(state): State<Arc<FakeState>>,
    Path(collection): Path<String>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.list_calls.fetch_add(1, Ordering::SeqCst);

    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    *state.last_authorization.lock().unwrap() = authorization.clone();

    let authorized = authorization
        .is_some_and(|token| state.issued.lock().unwrap().contains(&token));
    if !authorized {
        return error(StatusCode::UNAUTHORIZED, "The request requires admin authorization token to be set.");
    }

    if state.malformed_lists {
        return (StatusCode::OK, "{\"items\": [").into_response();
    }

    let clauses = params
        .get("filter")
        .map(|f| parse_filter(f))
        .unwrap_or_default();
    let matching: Vec<&Value> = state
        .collections
        .get(&collection)
        .into_iter()
        .flatten()
        .filter(|record| {
            clauses
                .iter()
                .all(|(field, value)| record[field].as_str().unwrap_or_default() == value)
        })
        .collect();

    let per_page = state.page_size;
    let page: usize = params
        .get("page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(1)
        .max(1);
    let total_items = matching.len();
    let total_pages = total_items.div_ceil(per_page).max(1);
    let items: Vec<&Value> = matching
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();

    let reported_page = if state.stuck_page_number { 1 } else { page };
    Json(json!({
        "page": reported_page,
        "perPage": per_page,
        "totalItems": total_items,
        "totalPages": total_pages,
        "items": items,
    }))
    .into_response()
}

fn error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({ "code": status.as_u16(), "message": message, "data": {} })),
    )
        .into_response()
}

/// Parse `a='x' && b='y'` with `\` escapes inside quotes.
fn parse_filter(expr: &str) -> Vec<(String, String)> {
    let mut clauses = Vec::new();
    let mut chars = expr.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| *c == ' ' || *c == '&') {
            chars.next();
        }

        let mut field = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' {
                break;
            }
            field.push(c);
            chars.next();
        }
        if field.trim().is_empty() || chars.next() != Some('=') || chars.next() != Some('\'') {
            break;
        }

        let mut value = String::new();
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        value.push(escaped);
                    }
                }
                '\'' => break,
                _ => value.push(c),
            }
        }
        clauses.push((field.trim().to_string(), value));
    }

    clauses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Filter;

    #[test]
    fn parses_filters_rendered_by_filter_builder() {
        let rendered = Filter::eq("email", "o'neil@example.com")
            .and_eq("revoked", "")
            .to_string();
        assert_eq!(
            parse_filter(&rendered),
            vec![
                ("email".to_string(), "o'neil@example.com".to_string()),
                ("revoked".to_string(), String::new()),
            ]
        );
    }
}
