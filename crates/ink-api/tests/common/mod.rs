//! In-memory collaborators and a router harness for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tower::ServiceExt;

use ink_api::backend::{AuthProvider, CollaboratorError, Database, Filter, Query};
use ink_api::llm::{LanguageModel, LlmRequest};
use ink_api::{build_router, AppState, ManualClock};
use ink_common::Principal;
use ink_config::AppConfig;

/// Epoch millis the manual clock starts at (2026-01-01T00:00:00Z).
pub const START_MILLIS: u64 = 1_767_225_600_000;

// ============================================================================
// Auth provider
// ============================================================================

#[derive(Default)]
pub struct FakeAuthProvider {
    tokens: Mutex<HashMap<String, Principal>>,
    created: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
    verify_calls: AtomicU64,
    unavailable: AtomicBool,
    reject_create: AtomicBool,
    next_id: AtomicU64,
}

impl FakeAuthProvider {
    pub fn with_token(&self, token: &str, user_id: &str) {
        self.tokens.lock().insert(
            token.to_string(),
            Principal::new(user_id, Some(format!("{}@example.com", user_id))),
        );
    }

    pub fn set_unavailable(&self, value: bool) {
        self.unavailable.store(value, Ordering::SeqCst);
    }

    pub fn set_reject_create(&self, value: bool) {
        self.reject_create.store(value, Ordering::SeqCst);
    }

    pub fn verify_calls(&self) -> u64 {
        self.verify_calls.load(Ordering::SeqCst)
    }

    pub fn created_users(&self) -> Vec<String> {
        self.created.lock().clone()
    }

    pub fn deleted_users(&self) -> Vec<String> {
        self.deleted.lock().clone()
    }
}

#[async_trait]
impl AuthProvider for FakeAuthProvider {
    async fn get_user(&self, token: &str) -> Result<Principal, CollaboratorError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable("connection refused".to_string()));
        }
        self.tokens.lock().get(token).cloned().ok_or(CollaboratorError::Rejected {
            status: 401,
            message: "invalid JWT".to_string(),
        })
    }

    async fn create_user(&self, email: &str, _password: &str) -> Result<Principal, CollaboratorError> {
        if self.reject_create.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Rejected {
                status: 422,
                message: "email exists".to_string(),
            });
        }
        let id = format!("new-user-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.created.lock().push(id.clone());
        Ok(Principal::new(id, Some(email.to_string())))
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), CollaboratorError> {
        self.deleted.lock().push(user_id.to_string());
        Ok(())
    }
}

// ============================================================================
// Database
// ============================================================================

/// Recorded database call: operation and table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbCall {
    pub op: &'static str,
    pub table: String,
}

type RowsHook = Box<dyn FnOnce(&mut Vec<Value>) + Send>;

#[derive(Default)]
pub struct FakeDatabase {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    calls: Mutex<Vec<DbCall>>,
    failing: Mutex<HashSet<(&'static str, String)>>,
    before_update: Mutex<Option<RowsHook>>,
    next_id: AtomicU64,
    tick: AtomicU64,
}

fn column_matches(row: &Value, filter: &Filter) -> bool {
    match row.get(&filter.column) {
        Some(Value::String(s)) => *s == filter.value,
        Some(Value::Null) | None => false,
        Some(other) => other.to_string() == filter.value,
    }
}

fn row_matches(row: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|f| column_matches(row, f))
}

impl FakeDatabase {
    pub fn seed(&self, table: &str, row: Value) {
        self.tables.lock().entry(table.to_string()).or_default().push(row);
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables.lock().get(table).cloned().unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<DbCall> {
        self.calls.lock().clone()
    }

    /// Calls other than `select`.
    pub fn mutating_calls(&self) -> Vec<DbCall> {
        self.calls().into_iter().filter(|c| c.op != "select").collect()
    }

    /// Make every `op` against `table` fail as unavailable.
    pub fn fail(&self, op: &'static str, table: &str) {
        self.failing.lock().insert((op, table.to_string()));
    }

    /// Mutate the target table right before the next `update` applies.
    pub fn before_next_update(&self, hook: impl FnOnce(&mut Vec<Value>) + Send + 'static) {
        *self.before_update.lock() = Some(Box::new(hook));
    }

    fn record(&self, op: &'static str, table: &str) -> Result<(), CollaboratorError> {
        self.calls.lock().push(DbCall { op, table: table.to_string() });
        if self.failing.lock().contains(&(op, table.to_string())) {
            return Err(CollaboratorError::Unavailable(format!("{} {} failed", op, table)));
        }
        Ok(())
    }

    fn stamp(&self, mut row: Value) -> Value {
        if let Value::Object(map) = &mut row {
            if !map.contains_key("id") {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                map.insert("id".to_string(), json!(format!("row-{}", id)));
            }
            if !map.contains_key("created_at") {
                // Strictly increasing so ordering is deterministic.
                let tick = self.tick.fetch_add(1, Ordering::SeqCst);
                let stamp = format!("2026-01-01T{:02}:{:02}:{:02}Z", tick / 3600, tick / 60 % 60, tick % 60);
                map.insert("created_at".to_string(), json!(stamp));
            }
        }
        row
    }
}

#[async_trait]
impl Database for FakeDatabase {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, CollaboratorError> {
        self.record("select", table)?;
        let mut rows: Vec<Value> = self
            .rows(table)
            .into_iter()
            .filter(|row| row_matches(row, &query.filters))
            .collect();

        if let Some(order) = &query.order {
            let key = |row: &Value| row.get(&order.column).map(|v| v.to_string()).unwrap_or_default();
            rows.sort_by_key(key);
            if order.descending {
                rows.reverse();
            }
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, CollaboratorError> {
        self.record("insert", table)?;
        let row = self.stamp(row);
        self.seed(table, row.clone());
        Ok(row)
    }

    async fn upsert(&self, table: &str, row: Value, on_conflict: &str) -> Result<Value, CollaboratorError> {
        self.record("upsert", table)?;
        let key = row.get(on_conflict).cloned();
        let mut tables = self.tables.lock();
        let rows = tables.entry(table.to_string()).or_default();

        if let Some(existing) = rows.iter_mut().find(|r| key.is_some() && r.get(on_conflict) == key.as_ref()) {
            if let (Value::Object(target), Value::Object(patch)) = (existing, &row) {
                for (k, v) in patch {
                    target.insert(k.clone(), v.clone());
                }
                return Ok(Value::Object(target.clone()));
            }
        }
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> Result<Vec<Value>, CollaboratorError> {
        self.record("update", table)?;
        let hook = self.before_update.lock().take();
        let mut tables = self.tables.lock();
        if let Some(hook) = hook {
            hook(tables.entry(table.to_string()).or_default());
        }
        let mut updated = Vec::new();
        if let Some(rows) = tables.get_mut(table) {
            for row in rows.iter_mut().filter(|r| row_matches(r, filters)) {
                if let (Value::Object(target), Value::Object(fields)) = (&mut *row, &patch) {
                    for (k, v) in fields {
                        target.insert(k.clone(), v.clone());
                    }
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<Vec<Value>, CollaboratorError> {
        self.record("delete", table)?;
        let mut tables = self.tables.lock();
        let mut deleted = Vec::new();
        if let Some(rows) = tables.get_mut(table) {
            rows.retain(|row| {
                if row_matches(row, filters) {
                    deleted.push(row.clone());
                    false
                } else {
                    true
                }
            });
        }
        Ok(deleted)
    }
}

// ============================================================================
// Language model
// ============================================================================

pub struct FakeLlm {
    reply: Mutex<String>,
    requests: Mutex<Vec<LlmRequest>>,
    unavailable: AtomicBool,
}

impl FakeLlm {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: Mutex::new(reply.to_string()),
            requests: Mutex::new(Vec::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn set_reply(&self, reply: &str) {
        *self.reply.lock() = reply.to_string();
    }

    pub fn set_unavailable(&self, value: bool) {
        self.unavailable.store(value, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl LanguageModel for FakeLlm {
    async fn complete(&self, request: LlmRequest) -> Result<String, CollaboratorError> {
        self.requests.lock().push(request);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable("upstream 529 overloaded".to_string()));
        }
        Ok(self.reply.lock().clone())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.backend.url = "http://backend.test".to_string();
    config.backend.service_key = "service-key".to_string();
    config.llm.api_key = "llm-key".to_string();
    config
}

pub struct TestApp {
    pub auth: Arc<FakeAuthProvider>,
    pub db: Arc<FakeDatabase>,
    pub llm: Arc<FakeLlm>,
    pub clock: Arc<ManualClock>,
    pub state: AppState,
    router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let auth = Arc::new(FakeAuthProvider::default());
        let db = Arc::new(FakeDatabase::default());
        let llm = Arc::new(FakeLlm::new("Thanks for sharing."));
        let clock = Arc::new(ManualClock::new(START_MILLIS));

        auth.with_token("token-u1", "u1");
        auth.with_token("token-u2", "u2");

        let state = AppState::with_clock(auth.clone(), db.clone(), llm.clone(), &config, clock.clone());
        let router = build_router(state.clone());

        Self { auth, db, llm, clock, state, router }
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.send(builder.body(body).unwrap()).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| json!(String::from_utf8_lossy(&bytes)))
        };
        TestResponse { status, body }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::DELETE, uri, token, Some(body)).await
    }
}

impl TestResponse {
    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }

    pub fn error(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}
