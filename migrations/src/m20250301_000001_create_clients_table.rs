use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Clients::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Clients::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Clients::Name).string().not_null())
                    .col(ColumnDef::new(Clients::Email).string().null())
                    .col(ColumnDef::new(Clients::Phone).string().null())
                    .col(ColumnDef::new(Clients::Address).string().null())
                    .col(ColumnDef::new(Clients::BillingCustomerId).string().null())
                    .col(ColumnDef::new(Clients::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Clients::UpdatedAt).timestamp().null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Clients::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Clients {
    Table,
    Id,
    Name,
    Email,
    Phone,
    Address,
    BillingCustomerId,
    CreatedAt,
    UpdatedAt,
}
