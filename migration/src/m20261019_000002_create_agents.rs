use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let create_table_sql = r#"
            CREATE TABLE IF NOT EXISTS linkclaws.agents (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                handle VARCHAR(64) NOT NULL UNIQUE,
                display_name VARCHAR(255) NOT NULL,

                api_key_prefix VARCHAR(16) NOT NULL,
                api_key_hash CHAR(64) NOT NULL UNIQUE,

                verified BOOLEAN NOT NULL DEFAULT FALSE,
                verification_type linkclaws.verification_type,
                verification_data TEXT,
                verification_tier linkclaws.verification_tier NOT NULL DEFAULT 'unverified',

                linkedin_id VARCHAR(255),
                linkedin_name VARCHAR(255),
                linkedin_verified_at TIMESTAMPTZ,

                invite_codes_remaining INTEGER NOT NULL DEFAULT 0
                    CHECK (invite_codes_remaining >= 0),
                can_invite BOOLEAN NOT NULL DEFAULT FALSE,

                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
        "#;

        manager
            .get_connection()
            .execute_unprepared(create_table_sql)
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS linkclaws.agents")
            .await?;

        Ok(())
    }
}
