use sea_orm_migration::prelude::*;

use super::m20250301_000001_create_clients_table::Clients;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LaborRates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LaborRates::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LaborRates::ClientId).uuid().not_null())
                    .col(ColumnDef::new(LaborRates::ProjectType).string().not_null())
                    .col(ColumnDef::new(LaborRates::BaseRate).decimal().not_null())
                    .col(
                        ColumnDef::new(LaborRates::ComplexityFactors)
                            .json()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LaborRates::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(LaborRates::UpdatedAt).timestamp().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_labor_rates_client_id")
                            .from(LaborRates::Table, LaborRates::ClientId)
                            .to(Clients::Table, Clients::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_labor_rates_client_project_type")
                    .table(LaborRates::Table)
                    .col(LaborRates::ClientId)
                    .col(LaborRates::ProjectType)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LaborRates::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum LaborRates {
    Table,
    Id,
    ClientId,
    ProjectType,
    BaseRate,
    ComplexityFactors,
    CreatedAt,
    UpdatedAt,
}
