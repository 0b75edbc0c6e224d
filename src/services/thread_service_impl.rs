//! `SeaORM` implementation of the `ThreadService` trait.

use async_trait::async_trait;
use rand::{Rng, distr::Alphanumeric};
use std::sync::Arc;
use tracing::info;

use crate::constants::{reports, threads::PUBLIC_TOKEN_LEN};
use crate::db::Store;
use crate::domain::ThreadStatus;
use crate::services::generation_cache::CachedGeneration;
use crate::services::sanitize::TextSanitizer;
use crate::services::thread_service::{
    CreatedThread, PostView, PublicThread, PublishResult, ThreadDetail, ThreadError,
    ThreadService, ThreadSummary,
};
use crate::services::timeline::{TimelineEntry, merge_timeline};

pub struct SeaOrmThreadService {
    store: Store,
    input_sanitizer: Arc<dyn TextSanitizer>,
    public_sanitizer: Arc<dyn TextSanitizer>,
    public_base_url: Option<String>,
}

impl SeaOrmThreadService {
    #[must_use]
    pub fn new(
        store: Store,
        input_sanitizer: Arc<dyn TextSanitizer>,
        public_sanitizer: Arc<dyn TextSanitizer>,
        public_base_url: Option<String>,
    ) -> Self {
        Self {
            store,
            input_sanitizer,
            public_sanitizer,
            public_base_url: public_base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
        }
    }

    fn share_url(&self, token: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{base}/p/{token}"),
            None => format!("/p/{token}"),
        }
    }

    fn required(&self, field: &str, value: &str) -> Result<String, ThreadError> {
        let clean = self.input_sanitizer.sanitize(value);
        if clean.is_empty() {
            return Err(ThreadError::Validation(format!("{field} is required")));
        }
        Ok(clean)
    }
}

fn new_public_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(PUBLIC_TOKEN_LEN)
        .map(char::from)
        .collect()
}

#[async_trait]
impl ThreadService for SeaOrmThreadService {
    async fn create_thread(
        &self,
        author_id: i32,
        title: &str,
        body: &str,
    ) -> Result<CreatedThread, ThreadError> {
        let title = self.required("title", title)?;
        let body = self.required("body", body)?;

        let (thread_id, post_id) = self
            .store
            .create_thread_with_post(&title, &body, author_id)
            .await?;

        Ok(CreatedThread { thread_id, post_id })
    }

    async fn list_threads(&self) -> Result<Vec<ThreadSummary>, ThreadError> {
        let rows = self.store.list_threads().await?;
        Ok(rows.into_iter().map(ThreadSummary::from).collect())
    }

    async fn thread_detail(&self, thread_id: i32) -> Result<ThreadDetail, ThreadError> {
        let thread = self
            .store
            .get_thread(thread_id)
            .await?
            .ok_or(ThreadError::NotFound(thread_id))?;

        let posts = self.store.visible_posts(thread_id).await?;
        let messages = self.store.message_history(thread_id).await?;
        let latest_summary = self
            .store
            .latest_summary(thread_id)
            .await?
            .map(CachedGeneration::from);

        let timeline = merge_timeline(
            messages.into_iter().map(TimelineEntry::from),
            posts.iter().cloned().map(TimelineEntry::from),
        );

        let share_url = thread
            .public_token
            .as_deref()
            .filter(|_| thread.is_public)
            .map(|token| self.share_url(token));

        Ok(ThreadDetail {
            thread: thread.into(),
            posts: posts.into_iter().map(PostView::from).collect(),
            latest_summary,
            timeline,
            share_url,
        })
    }

    async fn add_post(
        &self,
        thread_id: i32,
        author_id: i32,
        content: &str,
        parent_post_id: Option<i32>,
    ) -> Result<i32, ThreadError> {
        let content = self.required("content", content)?;

        let thread = self
            .store
            .get_thread(thread_id)
            .await?
            .ok_or(ThreadError::NotFound(thread_id))?;

        let status: ThreadStatus = thread.status.parse().unwrap_or_default();
        if !status.accepts_posts() {
            return Err(ThreadError::Locked(thread_id));
        }

        if let Some(parent_id) = parent_post_id {
            let parent = self.store.get_post(parent_id).await?;
            if parent.is_none_or(|p| p.thread_id != thread_id) {
                return Err(ThreadError::Validation(format!(
                    "parent post {parent_id} is not in thread {thread_id}"
                )));
            }
        }

        let post_id = self
            .store
            .add_post(thread_id, Some(author_id), parent_post_id, &content)
            .await?;

        Ok(post_id)
    }

    async fn report_post(
        &self,
        post_id: i32,
        reporter_id: i32,
        reason: Option<&str>,
    ) -> Result<i32, ThreadError> {
        if self.store.get_post(post_id).await?.is_none() {
            return Err(ThreadError::PostNotFound(post_id));
        }

        let reason = reason
            .map(|r| self.input_sanitizer.sanitize(r))
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| reports::DEFAULT_REASON.to_string());

        let report_id = self
            .store
            .add_report(reports::TARGET_POST, post_id, reporter_id, &reason)
            .await?;

        Ok(report_id)
    }

    async fn update_status(
        &self,
        thread_id: i32,
        actor_id: i32,
        status: &str,
    ) -> Result<ThreadStatus, ThreadError> {
        let status: ThreadStatus = status.parse().map_err(ThreadError::InvalidStatus)?;

        let thread = self
            .store
            .get_thread(thread_id)
            .await?
            .ok_or(ThreadError::NotFound(thread_id))?;

        if thread.created_by != Some(actor_id) {
            return Err(ThreadError::Forbidden);
        }

        self.store
            .set_thread_status(thread_id, status.as_str())
            .await?;

        info!(thread_id, status = %status, "Thread status changed");
        Ok(status)
    }

    async fn set_publish(
        &self,
        thread_id: i32,
        make_public: bool,
    ) -> Result<PublishResult, ThreadError> {
        let thread = self
            .store
            .get_thread(thread_id)
            .await?
            .ok_or(ThreadError::NotFound(thread_id))?;

        if !make_public {
            self.store.set_thread_public(thread_id, false, None).await?;
            info!(thread_id, "Thread unpublished");
            return Ok(PublishResult {
                is_public: false,
                share_url: None,
            });
        }

        let token = thread
            .public_token
            .filter(|t| !t.is_empty())
            .unwrap_or_else(new_public_token);

        self.store
            .set_thread_public(thread_id, true, Some(&token))
            .await?;

        info!(thread_id, "Thread published");
        Ok(PublishResult {
            is_public: true,
            share_url: Some(self.share_url(&token)),
        })
    }

    async fn public_view(&self, token: &str) -> Result<PublicThread, ThreadError> {
        let thread = self
            .store
            .get_public_thread(token)
            .await?
            .ok_or(ThreadError::ShareNotFound)?;

        let history = self
            .store
            .message_history(thread.id)
            .await?
            .into_iter()
            .map(|message| {
                let mut entry = TimelineEntry::from(message);
                entry.content = self.public_sanitizer.sanitize(&entry.content);
                entry
            })
            .collect();

        Ok(PublicThread {
            title: thread.title,
            created_at: thread.created_at,
            history,
        })
    }
}
