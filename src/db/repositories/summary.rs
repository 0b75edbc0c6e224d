use crate::entities::{ai_summaries, prelude::*};
use anyhow::{Context, Result};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    SqlErr,
};

/// Result of an insert against the `(thread_id, hash_key)` unique index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

/// Storage for generated replies (`ai_summaries`).
pub struct SummaryRepository {
    conn: DatabaseConnection,
}

impl SummaryRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn find(&self, thread_id: i32, hash_key: &str) -> Result<Option<ai_summaries::Model>> {
        AiSummaries::find()
            .filter(ai_summaries::Column::ThreadId.eq(thread_id))
            .filter(ai_summaries::Column::HashKey.eq(hash_key))
            .one(&self.conn)
            .await
            .context("Failed to query cached generation")
    }

    /// Plain insert; the unique index decides the winner between concurrent writers.
    pub async fn insert(
        &self,
        thread_id: i32,
        hash_key: &str,
        model: &str,
        mode: &str,
        content: &str,
    ) -> Result<InsertOutcome> {
        let active_model = ai_summaries::ActiveModel {
            thread_id: Set(thread_id),
            model: Set(model.to_string()),
            mode: Set(mode.to_string()),
            content: Set(content.to_string()),
            hash_key: Set(hash_key.to_string()),
            created_at: Set(crate::db::now_timestamp()),
            ..Default::default()
        };

        match AiSummaries::insert(active_model).exec(&self.conn).await {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Ok(InsertOutcome::AlreadyExists)
            }
            Err(err) => Err(err).context("Failed to store generated content"),
        }
    }

    pub async fn latest_for_thread(&self, thread_id: i32) -> Result<Option<ai_summaries::Model>> {
        AiSummaries::find()
            .filter(ai_summaries::Column::ThreadId.eq(thread_id))
            .order_by_desc(ai_summaries::Column::Id)
            .one(&self.conn)
            .await
            .context("Failed to query latest summary")
    }

    pub async fn count_for_thread(&self, thread_id: i32) -> Result<u64> {
        AiSummaries::find()
            .filter(ai_summaries::Column::ThreadId.eq(thread_id))
            .count(&self.conn)
            .await
            .context("Failed to count summaries")
    }
}
