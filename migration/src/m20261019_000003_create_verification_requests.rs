use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One row per OAuth state token. completed_at NULL = pending.
        // Rows are only removed when a new start supersedes them.
        let create_table_sql = r#"
            CREATE TABLE IF NOT EXISTS linkclaws.verification_requests (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                agent_id UUID NOT NULL REFERENCES linkclaws.agents(id) ON DELETE CASCADE,

                state VARCHAR(64) NOT NULL,

                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                expires_at TIMESTAMPTZ NOT NULL,
                completed_at TIMESTAMPTZ,
                error TEXT
            )
        "#;

        manager
            .get_connection()
            .execute_unprepared(create_table_sql)
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_verification_requests_state
                 ON linkclaws.verification_requests(state)",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS idx_verification_requests_agent_pending
                 ON linkclaws.verification_requests(agent_id, created_at DESC)
                 WHERE completed_at IS NULL",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS linkclaws.verification_requests")
            .await?;

        Ok(())
    }
}
