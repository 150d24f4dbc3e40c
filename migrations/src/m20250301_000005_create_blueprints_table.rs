use sea_orm_migration::prelude::*;

use super::m20250301_000004_create_projects_table::Projects;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Blueprints::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Blueprints::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Blueprints::ProjectId).uuid().not_null())
                    .col(ColumnDef::new(Blueprints::FileName).string().not_null())
                    .col(ColumnDef::new(Blueprints::ProcessedData).json().not_null())
                    .col(ColumnDef::new(Blueprints::AiAnalysis).json().null())
                    .col(
                        ColumnDef::new(Blueprints::Status)
                            .string()
                            .not_null()
                            .default("processed"),
                    )
                    .col(ColumnDef::new(Blueprints::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Blueprints::UpdatedAt).timestamp().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_blueprints_project_id")
                            .from(Blueprints::Table, Blueprints::ProjectId)
                            .to(Projects::Table, Projects::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Blueprints::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Blueprints {
    Table,
    Id,
    ProjectId,
    FileName,
    ProcessedData,
    AiAnalysis,
    Status,
    CreatedAt,
    UpdatedAt,
}
