use sea_orm_migration::prelude::*;

use super::m20250301_000006_create_estimates_table::Estimates;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EstimateMaterials::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EstimateMaterials::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EstimateMaterials::EstimateId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(EstimateMaterials::Name).string().not_null())
                    .col(ColumnDef::new(EstimateMaterials::Description).text().null())
                    .col(
                        ColumnDef::new(EstimateMaterials::Quantity)
                            .decimal()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EstimateMaterials::UnitPrice)
                            .decimal()
                            .not_null(),
                    )
                    .col(ColumnDef::new(EstimateMaterials::Unit).string().not_null())
                    .col(
                        ColumnDef::new(EstimateMaterials::TotalPrice)
                            .decimal()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EstimateMaterials::AiRecommended)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(EstimateMaterials::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_estimate_materials_estimate_id")
                            .from(EstimateMaterials::Table, EstimateMaterials::EstimateId)
                            .to(Estimates::Table, Estimates::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_estimate_materials_estimate_id")
                    .table(EstimateMaterials::Table)
                    .col(EstimateMaterials::EstimateId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EstimateMaterials::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum EstimateMaterials {
    Table,
    Id,
    EstimateId,
    Name,
    Description,
    Quantity,
    UnitPrice,
    Unit,
    TotalPrice,
    AiRecommended,
    CreatedAt,
}
