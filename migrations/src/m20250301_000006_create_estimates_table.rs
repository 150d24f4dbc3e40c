use sea_orm_migration::prelude::*;

use super::m20250301_000003_create_customers_table::Customers;
use super::m20250301_000004_create_projects_table::Projects;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Estimates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Estimates::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Estimates::ProjectId).uuid().not_null())
                    .col(ColumnDef::new(Estimates::CustomerId).uuid().not_null())
                    .col(ColumnDef::new(Estimates::BlueprintId).uuid().null())
                    .col(
                        ColumnDef::new(Estimates::Status)
                            .string()
                            .not_null()
                            .default("draft"),
                    )
                    .col(ColumnDef::new(Estimates::Notes).text().null())
                    .col(
                        ColumnDef::new(Estimates::TotalCost)
                            .decimal()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Estimates::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Estimates::UpdatedAt).timestamp().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_estimates_project_id")
                            .from(Estimates::Table, Estimates::ProjectId)
                            .to(Projects::Table, Projects::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_estimates_customer_id")
                            .from(Estimates::Table, Estimates::CustomerId)
                            .to(Customers::Table, Customers::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_estimates_project_id")
                    .table(Estimates::Table)
                    .col(Estimates::ProjectId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_estimates_status")
                    .table(Estimates::Table)
                    .col(Estimates::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Estimates::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Estimates {
    Table,
    Id,
    ProjectId,
    CustomerId,
    BlueprintId,
    Status,
    Notes,
    TotalCost,
    CreatedAt,
    UpdatedAt,
}
