//! `SeaORM` implementation of the `AuthService` trait.

use crate::config::SecurityConfig;
use crate::db::{CreateUserOutcome, Store};
use crate::services::auth_service::{AuthError, AuthService, UserInfo, normalize_email};
use async_trait::async_trait;
use tracing::info;

pub struct SeaOrmAuthService {
    store: Store,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, security: SecurityConfig) -> Self {
        Self { store, security }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn signup(
        &self,
        email: &str,
        display_name: Option<&str>,
        password: &str,
    ) -> Result<UserInfo, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() || !email.contains('@') {
            return Err(AuthError::Validation("A valid email is required".to_string()));
        }

        if password.chars().count() < self.security.min_password_length {
            return Err(AuthError::Validation(format!(
                "Password must be at least {} characters",
                self.security.min_password_length
            )));
        }

        let display_name = display_name.map(str::trim).filter(|n| !n.is_empty());

        match self
            .store
            .create_user(&email, display_name, password, &self.security)
            .await?
        {
            CreateUserOutcome::Created(user) => {
                info!(user_id = user.id, "New account registered");
                Ok(user.into())
            }
            CreateUserOutcome::EmailTaken => Err(AuthError::EmailTaken),
        }
    }

    async fn login(&self, email: &str, password: &str) -> Result<UserInfo, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let user = self
            .store
            .verify_user_password(&email, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        Ok(user.into())
    }

    async fn current_user(&self, user_id: i32) -> Result<UserInfo, AuthError> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        Ok(user.into())
    }
}
