use crate::config::SecurityConfig;
use crate::entities::{ai_summaries, messages, posts, reports};
use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::post::PostRow;
pub use repositories::summary::InsertOutcome;
pub use repositories::thread::ThreadRow;
pub use repositories::user::{CreateUserOutcome, User};

/// Timestamp format for every row this crate writes: UTC, microseconds, `Z` suffix.
/// Fixed width, so lexical order matches chronological order.
#[must_use]
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    /// Connects and applies migrations. Convenience for tools and tests that
    /// do not need the two steps separated.
    pub async fn open(db_url: &str) -> Result<Self> {
        let store = Self::connect(db_url, 5, 1).await?;
        store.initialize().await?;
        Ok(store)
    }

    /// Opens the connection pool. Does not touch the schema; call
    /// [`Store::initialize`] once at startup before serving requests.
    pub async fn connect(db_url: &str, max_connections: u32, min_connections: u32) -> Result<Self> {
        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:").trim_start_matches("//");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)
                    .with_context(|| format!("Failed to create database file {path_str}"))?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        info!(
            "Database connected (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    /// Idempotent schema setup: applies pending migrations, including the
    /// system account seed.
    pub async fn initialize(&self) -> Result<()> {
        use sea_orm_migration::MigratorTrait;

        migrator::Migrator::up(&self.conn, None)
            .await
            .context("Failed to apply migrations")?;

        info!("Database migrations applied");
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn thread_repo(&self) -> repositories::thread::ThreadRepository {
        repositories::thread::ThreadRepository::new(self.conn.clone())
    }

    fn post_repo(&self) -> repositories::post::PostRepository {
        repositories::post::PostRepository::new(self.conn.clone())
    }

    fn message_repo(&self) -> repositories::message::MessageRepository {
        repositories::message::MessageRepository::new(self.conn.clone())
    }

    fn summary_repo(&self) -> repositories::summary::SummaryRepository {
        repositories::summary::SummaryRepository::new(self.conn.clone())
    }

    fn report_repo(&self) -> repositories::report::ReportRepository {
        repositories::report::ReportRepository::new(self.conn.clone())
    }

    // ========================================================================
    // Users
    // ========================================================================

    pub async fn create_user(
        &self,
        email: &str,
        display_name: Option<&str>,
        password: &str,
        config: &SecurityConfig,
    ) -> Result<CreateUserOutcome> {
        self.user_repo()
            .create(email, display_name, password, config)
            .await
    }

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn verify_user_password(&self, email: &str, password: &str) -> Result<Option<User>> {
        self.user_repo().verify_password(email, password).await
    }

    pub async fn system_user(&self) -> Result<Option<User>> {
        self.user_repo().system_user().await
    }

    // ========================================================================
    // Threads
    // ========================================================================

    pub async fn create_thread(&self, title: &str, created_by: Option<i32>) -> Result<i32> {
        self.thread_repo().create(title, created_by).await
    }

    pub async fn create_thread_with_post(
        &self,
        title: &str,
        body: &str,
        author_id: i32,
    ) -> Result<(i32, i32)> {
        self.thread_repo()
            .create_with_first_post(title, body, author_id)
            .await
    }

    pub async fn get_thread(&self, id: i32) -> Result<Option<ThreadRow>> {
        self.thread_repo().get(id).await
    }

    pub async fn list_threads(&self) -> Result<Vec<ThreadRow>> {
        self.thread_repo().list_visible().await
    }

    pub async fn get_public_thread(&self, token: &str) -> Result<Option<ThreadRow>> {
        self.thread_repo().get_public_by_token(token).await
    }

    pub async fn set_thread_public(
        &self,
        id: i32,
        is_public: bool,
        token: Option<&str>,
    ) -> Result<bool> {
        self.thread_repo().set_public(id, is_public, token).await
    }

    pub async fn set_thread_status(&self, id: i32, status: &str) -> Result<bool> {
        self.thread_repo().set_status(id, status).await
    }

    // ========================================================================
    // Posts & messages
    // ========================================================================

    pub async fn add_post(
        &self,
        thread_id: i32,
        user_id: Option<i32>,
        parent_post_id: Option<i32>,
        content: &str,
    ) -> Result<i32> {
        self.post_repo()
            .add(thread_id, user_id, parent_post_id, content)
            .await
    }

    pub async fn get_post(&self, id: i32) -> Result<Option<posts::Model>> {
        self.post_repo().get(id).await
    }

    pub async fn first_post(&self, thread_id: i32) -> Result<Option<posts::Model>> {
        self.post_repo().first_for_thread(thread_id).await
    }

    pub async fn recent_posts(&self, thread_id: i32, limit: u64) -> Result<Vec<posts::Model>> {
        self.post_repo().recent_for_thread(thread_id, limit).await
    }

    pub async fn visible_posts(&self, thread_id: i32) -> Result<Vec<PostRow>> {
        self.post_repo().visible_for_thread(thread_id).await
    }

    pub async fn add_message(&self, thread_id: i32, role: &str, content: &str) -> Result<i32> {
        self.message_repo().add(thread_id, role, content).await
    }

    pub async fn message_history(&self, thread_id: i32) -> Result<Vec<messages::Model>> {
        self.message_repo().history(thread_id).await
    }

    // ========================================================================
    // Generated replies
    // ========================================================================

    pub async fn find_summary(
        &self,
        thread_id: i32,
        hash_key: &str,
    ) -> Result<Option<ai_summaries::Model>> {
        self.summary_repo().find(thread_id, hash_key).await
    }

    pub async fn insert_summary(
        &self,
        thread_id: i32,
        hash_key: &str,
        model: &str,
        mode: &str,
        content: &str,
    ) -> Result<InsertOutcome> {
        self.summary_repo()
            .insert(thread_id, hash_key, model, mode, content)
            .await
    }

    pub async fn latest_summary(&self, thread_id: i32) -> Result<Option<ai_summaries::Model>> {
        self.summary_repo().latest_for_thread(thread_id).await
    }

    pub async fn summary_count(&self, thread_id: i32) -> Result<u64> {
        self.summary_repo().count_for_thread(thread_id).await
    }

    // ========================================================================
    // Reports
    // ========================================================================

    pub async fn add_report(
        &self,
        target_type: &str,
        target_id: i32,
        reported_by: i32,
        reason: &str,
    ) -> Result<i32> {
        self.report_repo()
            .add(target_type, target_id, reported_by, reason)
            .await
    }

    pub async fn get_report(&self, id: i32) -> Result<Option<reports::Model>> {
        self.report_repo().get(id).await
    }
}
