//! Domain service for AI participation in threads.

use serde::Serialize;
use thiserror::Error;

use crate::domain::GenerationError;

#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("Thread not found: {0}")]
    NotFound(i32),

    /// The thread has no opening post to seed a reply from.
    #[error("Thread {0} has no article to respond to")]
    NoArticle(i32),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for ConversationError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for ConversationError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(format!("{err:#}"))
    }
}

/// Outcome of [`ConversationService::respond`].
#[derive(Debug, Clone, Serialize)]
pub struct ThreadReply {
    pub content: String,
    pub from_cache: bool,
    /// The AI-authored post appended to the thread.
    pub post_id: i32,
}

#[derive(Debug, Clone)]
pub struct AnalyzeRequest {
    pub thread_id: Option<i32>,
    pub thread_title: Option<String>,
    pub article: String,
    pub comment: String,
}

/// Outcome of [`ConversationService::analyze`]. A failed generation is still
/// recorded, with `role` set to `system` and the error text as `content`.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResult {
    pub thread_id: i32,
    pub role: String,
    pub content: String,
}

#[async_trait::async_trait]
pub trait ConversationService: Send + Sync {
    /// Produces (or replays) a conversational reply for a thread and appends
    /// it as a post by the AI account.
    ///
    /// # Errors
    ///
    /// - [`ConversationError::NoArticle`] if the thread has no posts.
    /// - [`ConversationError::Generation`] when generation fails; nothing is
    ///   stored in that case.
    async fn respond(&self, thread_id: i32) -> Result<ThreadReply, ConversationError>;

    /// Single-shot analysis of an article and a comment, recorded as legacy
    /// messages. Reuses `thread_id` when it exists, otherwise creates a thread.
    async fn analyze(
        &self,
        user_id: i32,
        request: AnalyzeRequest,
    ) -> Result<AnalyzeResult, ConversationError>;
}
