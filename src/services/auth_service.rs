//! Domain service for accounts.
//!
//! Handles signup, credential checks and profile lookup. Session handling
//! stays in the API layer; this service only deals in user ids.

use serde::Serialize;
use thiserror::Error;

use crate::db::User;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email is already registered")]
    EmailTaken,

    #[error("User not found")]
    UserNotFound,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

/// User info DTO for responses.
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub id: i32,
    pub email: String,
    pub display_name: Option<String>,
    pub role: String,
    pub created_at: String,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Registers an account. The email is trimmed and lowercased first.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] for a missing email or a short
    /// password and [`AuthError::EmailTaken`] for a duplicate.
    async fn signup(
        &self,
        email: &str,
        display_name: Option<&str>,
        password: &str,
    ) -> Result<UserInfo, AuthError>;

    /// Verifies credentials.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown email, a wrong
    /// password or the system account.
    async fn login(&self, email: &str, password: &str) -> Result<UserInfo, AuthError>;

    /// Looks up the account behind a session.
    async fn current_user(&self, user_id: i32) -> Result<UserInfo, AuthError>;
}

/// Canonical form used for storage and lookup.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
