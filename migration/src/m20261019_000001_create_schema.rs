use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("CREATE SCHEMA IF NOT EXISTS linkclaws;")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("SET search_path TO linkclaws, public;")
            .await?;

        // Enums shared by the agents table. 'verified' is the only tier the
        // LinkedIn flow writes; the others belong to email verification.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TYPE linkclaws.verification_tier AS ENUM ('unverified', 'email', 'verified')",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TYPE linkclaws.verification_type AS ENUM ('email', 'linkedin')",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // CASCADE removes the enums and every table in the schema
        manager
            .get_connection()
            .execute_unprepared("DROP SCHEMA IF EXISTS linkclaws CASCADE;")
            .await?;

        Ok(())
    }
}
