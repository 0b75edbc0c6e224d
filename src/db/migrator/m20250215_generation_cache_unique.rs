use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();

        // Older databases may hold duplicates from the check-then-insert era.
        conn.execute_unprepared(
            "DELETE FROM ai_summaries WHERE rowid NOT IN (SELECT MIN(rowid) FROM ai_summaries GROUP BY thread_id, hash_key)",
        )
        .await?;

        conn.execute_unprepared(
            "CREATE UNIQUE INDEX IF NOT EXISTS uq_ai_summaries_thread_hash ON ai_summaries(thread_id, hash_key)",
        )
        .await?;

        conn.execute_unprepared("CREATE INDEX IF NOT EXISTS idx_posts_thread_id ON posts(thread_id)")
            .await?;

        conn.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_posts_thread_time ON posts(thread_id, created_at)",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();

        conn.execute_unprepared("DROP INDEX IF EXISTS idx_posts_thread_time")
            .await?;
        conn.execute_unprepared("DROP INDEX IF EXISTS idx_posts_thread_id")
            .await?;
        conn.execute_unprepared("DROP INDEX IF EXISTS uq_ai_summaries_thread_hash")
            .await?;

        Ok(())
    }
}
