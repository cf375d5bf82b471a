//! REST client for a Supabase-style project (GoTrue auth + PostgREST).
//!
//! Data calls use the service-role key, which bypasses row level security.
//! Every row operation issued through this client must therefore already be
//! scoped to the caller by the request guard.

use async_trait::async_trait;
use ink_common::Principal;
use ink_config::BackendConfig;
use reqwest::{Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{AuthProvider, CollaboratorError, Database, Filter, Query};

const RETURN_REPRESENTATION: &str = "return=representation";
const MERGE_DUPLICATES: &str = "resolution=merge-duplicates,return=representation";
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl From<UserResponse> for Principal {
    fn from(user: UserResponse) -> Self {
        Principal::new(user.id, user.email)
    }
}

#[derive(Debug, Serialize)]
struct CreateUserRequest<'a> {
    email: &'a str,
    password: &'a str,
    email_confirm: bool,
}

/// Auth and data client for the hosted backend
pub struct SupabaseClient {
    base_url: String,
    service_key: String,
    client: reqwest::Client,
}

impl SupabaseClient {
    pub fn new(config: &BackendConfig) -> Result<Self, reqwest::Error> {
        let timeout = config.timeout();
        let client = reqwest::Client::builder()
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            service_key: config.service_key.clone(),
            client,
        })
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn service_request(&self, method: Method, url: String) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn rows(&self, request: RequestBuilder) -> Result<Vec<Value>, CollaboratorError> {
        let response = check_status(request.send().await?).await?;
        Ok(response.json::<Vec<Value>>().await?)
    }
}

fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|f| (f.column.clone(), format!("eq.{}", f.value)))
        .collect()
}

fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    params.extend(filter_params(&query.filters));
    if let Some(order) = &query.order {
        let direction = if order.descending { "desc" } else { "asc" };
        params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

/// Map non-2xx responses onto the collaborator taxonomy.
async fn check_status(response: Response) -> Result<Response, CollaboratorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let mut message = response.text().await.unwrap_or_default();
    if message.len() > MAX_ERROR_BODY {
        let cut = (0..=MAX_ERROR_BODY).rev().find(|i| message.is_char_boundary(*i)).unwrap_or(0);
        message.truncate(cut);
    }

    if status.is_client_error() {
        Err(CollaboratorError::Rejected { status: status.as_u16(), message })
    } else {
        Err(CollaboratorError::Unavailable(format!("status {}: {}", status, message)))
    }
}

fn first_row(rows: Vec<Value>, operation: &str) -> Result<Value, CollaboratorError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| CollaboratorError::Malformed(format!("{} returned no rows", operation)))
}

#[async_trait]
impl AuthProvider for SupabaseClient {
    async fn get_user(&self, token: &str) -> Result<Principal, CollaboratorError> {
        let response = self.client
            .get(self.auth_url("user"))
            .header("apikey", &self.service_key)
            .bearer_auth(token)
            .send()
            .await?;

        let user = check_status(response).await?.json::<UserResponse>().await?;
        Ok(user.into())
    }

    async fn create_user(&self, email: &str, password: &str) -> Result<Principal, CollaboratorError> {
        let body = CreateUserRequest { email, password, email_confirm: true };
        let response = self
            .service_request(Method::POST, self.auth_url("admin/users"))
            .json(&body)
            .send()
            .await?;

        let user = check_status(response).await?.json::<UserResponse>().await?;
        debug!(user_id = %user.id, "Auth user created");
        Ok(user.into())
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), CollaboratorError> {
        let path = format!("admin/users/{}", urlencoding::encode(user_id));
        let response = self
            .service_request(Method::DELETE, self.auth_url(&path))
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl Database for SupabaseClient {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, CollaboratorError> {
        let request = self
            .service_request(Method::GET, self.rest_url(table))
            .query(&query_params(query));
        self.rows(request).await
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, CollaboratorError> {
        let request = self
            .service_request(Method::POST, self.rest_url(table))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&row);
        first_row(self.rows(request).await?, "insert")
    }

    async fn upsert(&self, table: &str, row: Value, on_conflict: &str) -> Result<Value, CollaboratorError> {
        let request = self
            .service_request(Method::POST, self.rest_url(table))
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", MERGE_DUPLICATES)
            .json(&row);
        first_row(self.rows(request).await?, "upsert")
    }

    async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> Result<Vec<Value>, CollaboratorError> {
        let request = self
            .service_request(Method::PATCH, self.rest_url(table))
            .query(&filter_params(filters))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&patch);
        self.rows(request).await
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<Vec<Value>, CollaboratorError> {
        let request = self
            .service_request(Method::DELETE, self.rest_url(table))
            .query(&filter_params(filters))
            .header("Prefer", RETURN_REPRESENTATION);
        self.rows(request).await
    }
}
