// User/Role directory consumed by the bootstrap handler.
//
// The handler only needs three things from the backing store: whether an
// admin row exists, a lookup of a user by normalized email, and a single
// role insert. Each backend implements exactly that surface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod memory;
pub mod postgres;
pub mod supabase;

pub use memory::MemoryDirectory;
pub use postgres::PgDirectory;
pub use supabase::SupabaseDirectory;

/// Role values stored in the role table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "app_role", rename_all = "lowercase")]
pub enum AppRole {
    Admin,
    Moderator,
    User,
}

impl AppRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppRole::Admin => "admin",
            AppRole::Moderator => "moderator",
            AppRole::User => "user",
        }
    }
}

/// An existing account, created by the sign-up flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserIdentity {
    /// Case-insensitive comparison against an already-normalized address.
    pub fn matches_email(&self, normalized: &str) -> bool {
        self.email
            .as_deref()
            .map(|email| email.to_lowercase() == normalized)
            .unwrap_or(false)
    }
}

/// A `(user_id, role)` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub user_id: String,
    pub role: AppRole,
}

/// Outcome of the conditional admin insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleInsert {
    Inserted,
    /// Another admin row appeared before the write; nothing was inserted.
    AdminAlreadyExists,
}

/// Errors from directory backends. None of these reach the caller verbatim.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Directory unavailable: {0}")]
    Unavailable(String),

    #[error("Unexpected directory response: {0}")]
    UnexpectedResponse(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait Directory: Send + Sync {
    /// True when at least one row has `role = admin`.
    async fn admin_exists(&self) -> Result<bool, DirectoryError>;

    /// Linear search over every user, comparing emails case-insensitively.
    async fn find_user_by_email(
        &self,
        normalized_email: &str,
    ) -> Result<Option<UserIdentity>, DirectoryError>;

    /// Insert `(user_id, admin)` unless an admin row already exists.
    async fn insert_admin_role(&self, user_id: &str) -> Result<RoleInsert, DirectoryError>;

    async fn health_check(&self) -> Result<(), DirectoryError>;

    /// Short backend name for logs and the health payload.
    fn backend(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_value(AppRole::Admin).unwrap(), "admin");
        assert_eq!(AppRole::Moderator.as_str(), "moderator");
        let role: AppRole = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(role, AppRole::User);
    }

    #[test]
    fn identity_matches_email_case_insensitively() {
        let user = UserIdentity {
            id: "u1".to_string(),
            email: Some("Owner@Example.com".to_string()),
        };
        assert!(user.matches_email("owner@example.com"));
        assert!(!user.matches_email("other@example.com"));

        let no_email = UserIdentity { id: "u2".to_string(), email: None };
        assert!(!no_email.matches_email(""));
    }
}
