//! Hosted database and auth provider
//!
//! The provider owns user accounts and every persisted row. This layer only
//! resolves tokens, manages accounts for signup/deletion, and forwards
//! row operations scoped by user id.

use async_trait::async_trait;
use ink_common::Principal;
use serde_json::Value;
use thiserror::Error;

pub mod supabase;

pub use supabase::SupabaseClient;

pub const ENTRIES_TABLE: &str = "journal_entries";
pub const INTENTIONS_TABLE: &str = "intentions";
pub const SETTINGS_TABLE: &str = "user_settings";
pub const PROFILES_TABLE: &str = "profiles";
pub const INVITE_CODES_TABLE: &str = "invite_codes";

/// Failure of an outbound call to an external system.
///
/// Carries internal detail for logs. Never rendered to API clients.
#[derive(Error, Debug)]
pub enum CollaboratorError {
    /// The provider answered with a 4xx: the request or credential was refused.
    #[error("rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// Transport failure, timeout or 5xx.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The provider answered 2xx but the body was not what we expected.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl CollaboratorError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, CollaboratorError::Rejected { .. })
    }
}

impl From<reqwest::Error> for CollaboratorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CollaboratorError::Malformed(err.to_string())
        } else {
            CollaboratorError::Unavailable(err.to_string())
        }
    }
}

/// Equality filter on a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Self {
            column: column.into(),
            value: value.to_string(),
        }
    }
}

/// Row selection: equality filters, optional ordering and limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    pub fn order_desc(mut self, column: impl Into<String>) -> Self {
        self.order = Some(Order { column: column.into(), descending: true });
        self
    }

    pub fn order_asc(mut self, column: impl Into<String>) -> Self {
        self.order = Some(Order { column: column.into(), descending: false });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Account operations of the auth provider.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolve the user that owns `token`.
    async fn get_user(&self, token: &str) -> Result<Principal, CollaboratorError>;

    /// Create a confirmed user with a password login.
    async fn create_user(&self, email: &str, password: &str) -> Result<Principal, CollaboratorError>;

    /// Remove a user account.
    async fn delete_user(&self, user_id: &str) -> Result<(), CollaboratorError>;
}

/// Row operations of the hosted database. Rows are opaque JSON objects.
#[async_trait]
pub trait Database: Send + Sync {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, CollaboratorError>;

    /// Insert one row and return it as stored.
    async fn insert(&self, table: &str, row: Value) -> Result<Value, CollaboratorError>;

    /// Insert or merge one row keyed by `on_conflict` and return it as stored.
    async fn upsert(&self, table: &str, row: Value, on_conflict: &str) -> Result<Value, CollaboratorError>;

    /// Patch all rows matching `filters`; returns the updated rows.
    async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> Result<Vec<Value>, CollaboratorError>;

    /// Delete all rows matching `filters`; returns the deleted rows.
    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<Vec<Value>, CollaboratorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder() {
        let query = Query::new()
            .eq("user_id", "u1")
            .eq("used", false)
            .order_desc("created_at")
            .limit(10);

        assert_eq!(query.filters, vec![Filter::eq("user_id", "u1"), Filter::eq("used", "false")]);
        assert_eq!(query.order, Some(Order { column: "created_at".to_string(), descending: true }));
        assert_eq!(query.limit, Some(10));
    }

    #[test]
    fn test_rejection_detection() {
        let rejected = CollaboratorError::Rejected { status: 401, message: "bad jwt".to_string() };
        assert!(rejected.is_rejection());
        assert!(!CollaboratorError::Unavailable("timeout".to_string()).is_rejection());
    }
}
