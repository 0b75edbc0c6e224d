//! Domain service for threads, posts, reports and public sharing.

use serde::Serialize;
use thiserror::Error;

use crate::db::{PostRow, ThreadRow};
use crate::domain::ThreadStatus;
use crate::services::generation_cache::CachedGeneration;
use crate::services::timeline::TimelineEntry;

#[derive(Debug, Error)]
pub enum ThreadError {
    #[error("Thread not found: {0}")]
    NotFound(i32),

    #[error("Shared thread not found")]
    ShareNotFound,

    #[error("Post not found: {0}")]
    PostNotFound(i32),

    #[error("Thread {0} is not accepting posts")]
    Locked(i32),

    #[error("Only the thread author can do that")]
    Forbidden,

    #[error("Invalid thread status: {0}")]
    InvalidStatus(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for ThreadError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for ThreadError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(format!("{err:#}"))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadSummary {
    pub id: i32,
    pub title: String,
    pub status: ThreadStatus,
    pub is_public: bool,
    pub created_at: String,
    pub created_by: Option<i32>,
    pub author_name: Option<String>,
}

impl From<ThreadRow> for ThreadSummary {
    fn from(row: ThreadRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            status: row.status.parse().unwrap_or_default(),
            is_public: row.is_public,
            created_at: row.created_at,
            created_by: row.created_by,
            author_name: row.author_name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: i32,
    pub user_id: Option<i32>,
    pub parent_post_id: Option<i32>,
    pub author_name: Option<String>,
    pub content: String,
    pub created_at: String,
}

impl From<PostRow> for PostView {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            parent_post_id: row.parent_post_id,
            author_name: row.author_name,
            content: row.content,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadDetail {
    pub thread: ThreadSummary,
    pub posts: Vec<PostView>,
    pub latest_summary: Option<CachedGeneration>,
    /// Legacy messages and posts, oldest first.
    pub timeline: Vec<TimelineEntry>,
    pub share_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CreatedThread {
    pub thread_id: i32,
    pub post_id: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishResult {
    pub is_public: bool,
    /// Absolute when a public base URL is configured, otherwise `/p/{token}`.
    pub share_url: Option<String>,
}

/// Read-only projection served at `/p/{token}`.
#[derive(Debug, Clone, Serialize)]
pub struct PublicThread {
    pub title: String,
    pub created_at: String,
    pub history: Vec<TimelineEntry>,
}

#[async_trait::async_trait]
pub trait ThreadService: Send + Sync {
    /// Creates a private, open thread together with its opening post.
    ///
    /// # Errors
    ///
    /// Returns [`ThreadError::Validation`] if title or body is blank after
    /// sanitizing.
    async fn create_thread(
        &self,
        author_id: i32,
        title: &str,
        body: &str,
    ) -> Result<CreatedThread, ThreadError>;

    /// Newest first, hidden threads excluded.
    async fn list_threads(&self) -> Result<Vec<ThreadSummary>, ThreadError>;

    async fn thread_detail(&self, thread_id: i32) -> Result<ThreadDetail, ThreadError>;

    /// Appends a post and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`ThreadError::Locked`] unless the thread is open.
    async fn add_post(
        &self,
        thread_id: i32,
        author_id: i32,
        content: &str,
        parent_post_id: Option<i32>,
    ) -> Result<i32, ThreadError>;

    /// Files an open report against a post and returns the report id.
    async fn report_post(
        &self,
        post_id: i32,
        reporter_id: i32,
        reason: Option<&str>,
    ) -> Result<i32, ThreadError>;

    /// Changes the moderation state. Only the thread's author may do this.
    async fn update_status(
        &self,
        thread_id: i32,
        actor_id: i32,
        status: &str,
    ) -> Result<ThreadStatus, ThreadError>;

    /// Publishes or unpublishes a thread. The share token survives
    /// unpublishing, so republishing yields the same link.
    async fn set_publish(
        &self,
        thread_id: i32,
        make_public: bool,
    ) -> Result<PublishResult, ThreadError>;

    /// The public projection, or [`ThreadError::ShareNotFound`] unless published.
    async fn public_view(&self, token: &str) -> Result<PublicThread, ThreadError>;
}
