use axum::{
    Extension, Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::validate_id;
use super::{AnalyzeBody, ApiError, ApiResponse, AppState};
use crate::services::{AnalyzeRequest, AnalyzeResult, ConversationError, ThreadReply};

impl From<ConversationError> for ApiError {
    fn from(err: ConversationError) -> Self {
        match err {
            ConversationError::NotFound(id) => Self::not_found("Thread", id),
            ConversationError::NoArticle(_) => Self::ValidationError(err.to_string()),
            ConversationError::Validation(msg) => Self::ValidationError(msg),
            ConversationError::Generation(e) => e.into(),
            ConversationError::Database(msg) => Self::DatabaseError(msg),
        }
    }
}

/// POST /threads/{id}/respond
/// Appends an AI reply, replaying the stored one when nothing changed.
pub async fn respond(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ThreadReply>>, ApiError> {
    let id = validate_id("thread", id)?;
    let reply = state.shared.conversation_service.respond(id).await?;
    Ok(Json(ApiResponse::success(reply)))
}

/// POST /analyze
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(payload): Json<AnalyzeBody>,
) -> Result<Json<ApiResponse<AnalyzeResult>>, ApiError> {
    if let Some(id) = payload.thread_id {
        validate_id("thread", id)?;
    }

    let result = state
        .shared
        .conversation_service
        .analyze(
            user_id,
            AnalyzeRequest {
                thread_id: payload.thread_id,
                thread_title: payload.thread_title,
                article: payload.article,
                comment: payload.comment,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(result)))
}
