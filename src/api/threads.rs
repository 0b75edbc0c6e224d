use axum::{
    Extension, Json,
    extract::{Path, State},
    http::HeaderMap,
};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::validate_id;
use super::{
    ApiError, ApiResponse, AppState, CreatePostRequest, CreateThreadRequest, CreatedPostResponse,
    PublishRequest, ReportRequest, ReportResponse, StatusRequest, StatusResponse,
};
use crate::services::{CreatedThread, PublishResult, ThreadDetail, ThreadError, ThreadSummary};

impl From<ThreadError> for ApiError {
    fn from(err: ThreadError) -> Self {
        match err {
            ThreadError::NotFound(id) => Self::not_found("Thread", id),
            ThreadError::PostNotFound(id) => Self::not_found("Post", id),
            ThreadError::ShareNotFound => Self::NotFound(err.to_string()),
            ThreadError::Locked(_) => Self::Conflict(err.to_string()),
            ThreadError::Forbidden => Self::Forbidden(err.to_string()),
            ThreadError::InvalidStatus(_) => Self::ValidationError(err.to_string()),
            ThreadError::Validation(msg) => Self::ValidationError(msg),
            ThreadError::Database(msg) => Self::DatabaseError(msg),
        }
    }
}

/// GET /threads
pub async fn list_threads(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<ThreadSummary>>>, ApiError> {
    let threads = state.shared.thread_service.list_threads().await?;
    Ok(Json(ApiResponse::success(threads)))
}

/// GET /threads/{id}
pub async fn get_thread(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ThreadDetail>>, ApiError> {
    let id = validate_id("thread", id)?;
    let detail = state.shared.thread_service.thread_detail(id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// POST /threads
pub async fn create_thread(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(payload): Json<CreateThreadRequest>,
) -> Result<Json<ApiResponse<CreatedThread>>, ApiError> {
    let created = state
        .shared
        .thread_service
        .create_thread(user_id, &payload.title, &payload.body)
        .await?;

    Ok(Json(ApiResponse::success(created)))
}

/// POST /threads/{id}/posts
pub async fn add_post(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<i32>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<Json<ApiResponse<CreatedPostResponse>>, ApiError> {
    let id = validate_id("thread", id)?;
    if let Some(parent) = payload.parent_post_id {
        validate_id("post", parent)?;
    }

    let post_id = state
        .shared
        .thread_service
        .add_post(id, user_id, &payload.content, payload.parent_post_id)
        .await?;

    Ok(Json(ApiResponse::success(CreatedPostResponse { post_id })))
}

/// PUT /threads/{id}/status
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<i32>,
    Json(payload): Json<StatusRequest>,
) -> Result<Json<ApiResponse<StatusResponse>>, ApiError> {
    let id = validate_id("thread", id)?;
    let status = state
        .shared
        .thread_service
        .update_status(id, user_id, &payload.status)
        .await?;

    Ok(Json(ApiResponse::success(StatusResponse { status })))
}

/// POST /threads/{id}/publish
///
/// Without a configured public base URL the share link is made absolute from
/// the request's `Host` header.
pub async fn publish(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    headers: HeaderMap,
    Json(payload): Json<PublishRequest>,
) -> Result<Json<ApiResponse<PublishResult>>, ApiError> {
    let id = validate_id("thread", id)?;
    let mut result = state
        .shared
        .thread_service
        .set_publish(id, payload.make_public)
        .await?;

    result.share_url = result
        .share_url
        .map(|url| absolutize_share_url(url, &headers));

    Ok(Json(ApiResponse::success(result)))
}

/// POST /posts/{id}/report
pub async fn report_post(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<i32>,
    payload: Option<Json<ReportRequest>>,
) -> Result<Json<ApiResponse<ReportResponse>>, ApiError> {
    let id = validate_id("post", id)?;
    let reason = payload.and_then(|Json(body)| body.reason);

    let report_id = state
        .shared
        .thread_service
        .report_post(id, user_id, reason.as_deref())
        .await?;

    Ok(Json(ApiResponse::success(ReportResponse { report_id })))
}

fn absolutize_share_url(url: String, headers: &HeaderMap) -> String {
    if !url.starts_with('/') {
        return url;
    }

    let Some(host) = headers
        .get(axum::http::header::HOST)
        .and_then(|h| h.to_str().ok())
        .filter(|h| !h.is_empty())
    else {
        return url;
    };

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .filter(|p| matches!(*p, "http" | "https"))
        .unwrap_or("http");

    format!("{scheme}://{host}{url}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn relative_share_url_uses_host_header() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("forum.local:8080"));

        assert_eq!(
            absolutize_share_url("/p/abc".to_string(), &headers),
            "http://forum.local:8080/p/abc"
        );

        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert_eq!(
            absolutize_share_url("/p/abc".to_string(), &headers),
            "https://forum.local:8080/p/abc"
        );
    }

    #[test]
    fn absolute_or_hostless_urls_are_kept() {
        let mut headers = HeaderMap::new();
        assert_eq!(absolutize_share_url("/p/abc".to_string(), &headers), "/p/abc");

        headers.insert("host", HeaderValue::from_static("forum.local"));
        assert_eq!(
            absolutize_share_url("https://agora.example/p/abc".to_string(), &headers),
            "https://agora.example/p/abc"
        );
    }
}
