use axum::{
    Json,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower_sessions::Session;

use super::validation::validate_credentials;
use super::{ApiError, ApiResponse, AppState, LoginRequest, MessageResponse, SignupRequest};
use crate::services::{AuthError, UserInfo};

/// Session key holding the signed-in user's id.
pub const SESSION_USER_KEY: &str = "user_id";

/// Inserted into request extensions by [`auth_middleware`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub i32);

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::Unauthorized(err.to_string()),
            AuthError::UserNotFound => Self::unauthorized(),
            AuthError::EmailTaken => Self::Conflict(err.to_string()),
            AuthError::Validation(msg) => Self::ValidationError(msg),
            AuthError::Database(msg) => Self::DatabaseError(msg),
            AuthError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

async fn session_user(session: &Session) -> Option<i32> {
    session.get::<i32>(SESSION_USER_KEY).await.ok().flatten()
}

/// Rejects requests without a signed-in session.
pub async fn auth_middleware(
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(user_id) = session_user(&session).await else {
        return Err(ApiError::unauthorized());
    };

    tracing::Span::current().record("user_id", user_id);
    request.extensions_mut().insert(CurrentUser(user_id));
    Ok(next.run(request).await)
}

async fn start_session(session: &Session, user_id: i32) -> Result<(), ApiError> {
    // New id on privilege change.
    session
        .cycle_id()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to rotate session: {e}")))?;
    session
        .insert(SESSION_USER_KEY, user_id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))
}

/// POST /auth/signup
/// Creates an account and signs it in.
pub async fn signup(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<SignupRequest>,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let email = validate_credentials(&payload.email, &payload.password)?;

    let user = state
        .shared
        .auth_service
        .signup(email, payload.display_name.as_deref(), &payload.password)
        .await?;

    start_session(&session, user.id).await?;
    tracing::info!(user_id = user.id, "Account created");

    Ok(Json(ApiResponse::success(user)))
}

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let email = validate_credentials(&payload.email, &payload.password)?;

    let user = state
        .shared
        .auth_service
        .login(email, &payload.password)
        .await?;

    start_session(&session, user.id).await?;
    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(ApiResponse::success(user)))
}

/// POST /auth/logout
pub async fn logout(session: Session) -> Result<impl IntoResponse, ApiError> {
    session
        .flush()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to end session: {e}")))?;

    Ok(Json(ApiResponse::success(MessageResponse::new("Logged out"))))
}

/// GET /auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let user_id = session_user(&session)
        .await
        .ok_or_else(ApiError::unauthorized)?;

    let user = state.shared.auth_service.current_user(user_id).await?;
    Ok(Json(ApiResponse::success(user)))
}
