use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Materials::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Materials::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Materials::SupplierSku).string().null())
                    .col(ColumnDef::new(Materials::Name).string().not_null())
                    .col(ColumnDef::new(Materials::Description).text().null())
                    .col(ColumnDef::new(Materials::Category).string().not_null())
                    .col(ColumnDef::new(Materials::Unit).string().not_null())
                    .col(ColumnDef::new(Materials::UnitPrice).decimal().not_null())
                    .col(ColumnDef::new(Materials::Supplier).string().not_null())
                    .col(ColumnDef::new(Materials::LastSync).timestamp().null())
                    .col(ColumnDef::new(Materials::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Materials::UpdatedAt).timestamp().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_materials_supplier_sku")
                    .table(Materials::Table)
                    .col(Materials::SupplierSku)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_materials_category")
                    .table(Materials::Table)
                    .col(Materials::Category)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MaterialPriceHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MaterialPriceHistory::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MaterialPriceHistory::MaterialId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MaterialPriceHistory::Price)
                            .decimal()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MaterialPriceHistory::RecordedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_material_price_history_material_id")
                            .from(
                                MaterialPriceHistory::Table,
                                MaterialPriceHistory::MaterialId,
                            )
                            .to(Materials::Table, Materials::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_material_price_history_material_id")
                    .table(MaterialPriceHistory::Table)
                    .col(MaterialPriceHistory::MaterialId)
                    .col(MaterialPriceHistory::RecordedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MaterialPriceHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Materials::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Materials {
    Table,
    Id,
    SupplierSku,
    Name,
    Description,
    Category,
    Unit,
    UnitPrice,
    Supplier,
    LastSync,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub enum MaterialPriceHistory {
    Table,
    Id,
    MaterialId,
    Price,
    RecordedAt,
}
