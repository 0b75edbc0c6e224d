use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::validation::validate_token;
use super::{ApiError, ApiResponse, AppState};
use crate::services::PublicThread;

/// GET /p/{token}
/// Read-only view of a published thread. No session needed.
pub async fn shared_thread(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<ApiResponse<PublicThread>>, ApiError> {
    let token = validate_token(&token)?;
    let view = state.shared.thread_service.public_view(token).await?;
    Ok(Json(ApiResponse::success(view)))
}
