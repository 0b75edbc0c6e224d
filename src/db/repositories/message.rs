use crate::entities::{messages, prelude::*};
use anyhow::{Context, Result};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};

/// Repository for the legacy `messages` history.
pub struct MessageRepository {
    conn: DatabaseConnection,
}

impl MessageRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn add(&self, thread_id: i32, role: &str, content: &str) -> Result<i32> {
        let active_model = messages::ActiveModel {
            thread_id: Set(thread_id),
            role: Set(role.to_string()),
            content: Set(content.to_string()),
            created_at: Set(crate::db::now_timestamp()),
            ..Default::default()
        };

        let res = Messages::insert(active_model)
            .exec(&self.conn)
            .await
            .context("Failed to insert message")?;

        Ok(res.last_insert_id)
    }

    pub async fn history(&self, thread_id: i32) -> Result<Vec<messages::Model>> {
        Messages::find()
            .filter(messages::Column::ThreadId.eq(thread_id))
            .order_by_asc(messages::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to query message history")
    }
}
