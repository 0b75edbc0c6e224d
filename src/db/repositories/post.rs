use crate::entities::{posts, prelude::*, users};
use anyhow::{Context, Result};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

/// Post joined with its author's display name.
#[derive(Debug, Clone)]
pub struct PostRow {
    pub id: i32,
    pub thread_id: i32,
    pub user_id: Option<i32>,
    pub parent_post_id: Option<i32>,
    pub content: String,
    pub created_at: String,
    pub author_name: Option<String>,
}

pub struct PostRepository {
    conn: DatabaseConnection,
}

impl PostRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_row(post: posts::Model, author: Option<users::Model>) -> PostRow {
        PostRow {
            id: post.id,
            thread_id: post.thread_id,
            user_id: post.user_id,
            parent_post_id: post.parent_post_id,
            content: post.content,
            created_at: post.created_at,
            author_name: author.and_then(|u| u.display_name),
        }
    }

    pub async fn add(
        &self,
        thread_id: i32,
        user_id: Option<i32>,
        parent_post_id: Option<i32>,
        content: &str,
    ) -> Result<i32> {
        let active_model = posts::ActiveModel {
            thread_id: Set(thread_id),
            user_id: Set(user_id),
            parent_post_id: Set(parent_post_id),
            content: Set(content.to_string()),
            is_hidden: Set(false),
            created_at: Set(crate::db::now_timestamp()),
            updated_at: Set(None),
            ..Default::default()
        };

        let res = Posts::insert(active_model)
            .exec(&self.conn)
            .await
            .context("Failed to insert post")?;

        Ok(res.last_insert_id)
    }

    pub async fn get(&self, id: i32) -> Result<Option<posts::Model>> {
        Posts::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query post")
    }

    /// The opening post, which seeds AI replies.
    pub async fn first_for_thread(&self, thread_id: i32) -> Result<Option<posts::Model>> {
        Posts::find()
            .filter(posts::Column::ThreadId.eq(thread_id))
            .order_by_asc(posts::Column::Id)
            .one(&self.conn)
            .await
            .context("Failed to query first post")
    }

    /// Newest first, hidden posts included (they still shape the conversation).
    pub async fn recent_for_thread(&self, thread_id: i32, limit: u64) -> Result<Vec<posts::Model>> {
        Posts::find()
            .filter(posts::Column::ThreadId.eq(thread_id))
            .order_by_desc(posts::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to query recent posts")
    }

    /// Oldest first, hidden posts excluded.
    pub async fn visible_for_thread(&self, thread_id: i32) -> Result<Vec<PostRow>> {
        let rows = Posts::find()
            .filter(posts::Column::ThreadId.eq(thread_id))
            .filter(posts::Column::IsHidden.eq(false))
            .find_also_related(Users)
            .order_by_asc(posts::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list posts")?;

        Ok(rows
            .into_iter()
            .map(|(post, author)| Self::map_row(post, author))
            .collect())
    }
}
