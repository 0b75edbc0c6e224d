use crate::constants::threads::{STATUS_HIDDEN, STATUS_OPEN};
use crate::entities::{posts, prelude::*, threads, users};
use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::info;

/// Thread joined with its author's display name.
#[derive(Debug, Clone)]
pub struct ThreadRow {
    pub id: i32,
    pub title: String,
    pub is_public: bool,
    pub public_token: Option<String>,
    pub status: String,
    pub created_at: String,
    pub created_by: Option<i32>,
    pub author_name: Option<String>,
}

pub struct ThreadRepository {
    conn: DatabaseConnection,
}

impl ThreadRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_row(thread: threads::Model, author: Option<users::Model>) -> ThreadRow {
        ThreadRow {
            id: thread.id,
            title: thread.title,
            is_public: thread.is_public,
            public_token: thread.public_token,
            status: thread.status,
            created_at: thread.created_at,
            created_by: thread.created_by,
            author_name: author.and_then(|u| u.display_name),
        }
    }

    /// Bare thread without a first post (used by the legacy analysis flow).
    pub async fn create(&self, title: &str, created_by: Option<i32>) -> Result<i32> {
        let active_model = threads::ActiveModel {
            title: Set(title.to_string()),
            is_public: Set(false),
            public_token: Set(None),
            created_at: Set(crate::db::now_timestamp()),
            created_by: Set(created_by),
            status: Set(STATUS_OPEN.to_string()),
            ..Default::default()
        };

        let res = Threads::insert(active_model)
            .exec(&self.conn)
            .await
            .context("Failed to insert thread")?;

        info!("Created thread {}", res.last_insert_id);
        Ok(res.last_insert_id)
    }

    /// Creates a thread and its opening post in one transaction.
    /// Returns `(thread_id, post_id)`.
    pub async fn create_with_first_post(
        &self,
        title: &str,
        body: &str,
        author_id: i32,
    ) -> Result<(i32, i32)> {
        let txn = self.conn.begin().await?;
        let now = crate::db::now_timestamp();

        let thread = threads::ActiveModel {
            title: Set(title.to_string()),
            is_public: Set(false),
            public_token: Set(None),
            created_at: Set(now.clone()),
            created_by: Set(Some(author_id)),
            status: Set(STATUS_OPEN.to_string()),
            ..Default::default()
        };
        let thread_id = Threads::insert(thread).exec(&txn).await?.last_insert_id;

        let post = posts::ActiveModel {
            thread_id: Set(thread_id),
            user_id: Set(Some(author_id)),
            parent_post_id: Set(None),
            content: Set(body.to_string()),
            is_hidden: Set(false),
            created_at: Set(now),
            updated_at: Set(None),
            ..Default::default()
        };
        let post_id = Posts::insert(post).exec(&txn).await?.last_insert_id;

        txn.commit().await.context("Failed to commit new thread")?;

        info!("Created thread {} by user {}", thread_id, author_id);
        Ok((thread_id, post_id))
    }

    pub async fn get(&self, id: i32) -> Result<Option<ThreadRow>> {
        let row = Threads::find_by_id(id)
            .find_also_related(Users)
            .one(&self.conn)
            .await
            .context("Failed to query thread")?;

        Ok(row.map(|(thread, author)| Self::map_row(thread, author)))
    }

    /// Newest first, hidden threads excluded.
    pub async fn list_visible(&self) -> Result<Vec<ThreadRow>> {
        let rows = Threads::find()
            .filter(threads::Column::Status.ne(STATUS_HIDDEN))
            .find_also_related(Users)
            .order_by_desc(threads::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list threads")?;

        Ok(rows
            .into_iter()
            .map(|(thread, author)| Self::map_row(thread, author))
            .collect())
    }

    pub async fn get_public_by_token(&self, token: &str) -> Result<Option<ThreadRow>> {
        let row = Threads::find()
            .filter(threads::Column::PublicToken.eq(token))
            .filter(threads::Column::IsPublic.eq(true))
            .find_also_related(Users)
            .one(&self.conn)
            .await
            .context("Failed to query public thread")?;

        Ok(row.map(|(thread, author)| Self::map_row(thread, author)))
    }

    /// Returns `false` when the thread does not exist.
    pub async fn set_public(&self, id: i32, is_public: bool, token: Option<&str>) -> Result<bool> {
        let Some(thread) = Threads::find_by_id(id).one(&self.conn).await? else {
            return Ok(false);
        };

        let mut active: threads::ActiveModel = thread.into();
        active.is_public = Set(is_public);
        if let Some(token) = token {
            active.public_token = Set(Some(token.to_string()));
        }
        active.update(&self.conn).await?;

        Ok(true)
    }

    pub async fn set_status(&self, id: i32, status: &str) -> Result<bool> {
        let Some(thread) = Threads::find_by_id(id).one(&self.conn).await? else {
            return Ok(false);
        };

        let mut active: threads::ActiveModel = thread.into();
        active.status = Set(status.to_string());
        active.update(&self.conn).await?;

        Ok(true)
    }
}
