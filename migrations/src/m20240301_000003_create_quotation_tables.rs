use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Quotations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Quotations::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Quotations::QuoteNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Quotations::CustomerId).uuid().not_null())
                    .col(
                        ColumnDef::new(Quotations::Status)
                            .string()
                            .not_null()
                            .default("draft"),
                    )
                    .col(
                        ColumnDef::new(Quotations::ValidUntil)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Quotations::TotalAmount).decimal().not_null())
                    .col(ColumnDef::new(Quotations::Currency).string().not_null())
                    .col(ColumnDef::new(Quotations::Notes).text().null())
                    .col(ColumnDef::new(Quotations::ConvertedOrderId).uuid().null())
                    .col(
                        ColumnDef::new(Quotations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Quotations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_quotations_customer_id")
                            .from(Quotations::Table, Quotations::CustomerId)
                            .to(
                                super::m20240301_000001_create_customer_tables::Customers::Table,
                                super::m20240301_000001_create_customer_tables::Customers::Id,
                            )
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(QuotationItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(QuotationItems::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(QuotationItems::QuotationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(QuotationItems::Description)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(QuotationItems::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(QuotationItems::UnitPrice)
                            .decimal()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(QuotationItems::TotalPrice)
                            .decimal()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_quotation_items_quotation_id")
                            .from(QuotationItems::Table, QuotationItems::QuotationId)
                            .to(Quotations::Table, Quotations::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(QuotationItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Quotations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Quotations {
    Table,
    Id,
    QuoteNumber,
    CustomerId,
    Status,
    ValidUntil,
    TotalAmount,
    Currency,
    Notes,
    ConvertedOrderId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum QuotationItems {
    Table,
    Id,
    QuotationId,
    Description,
    Quantity,
    UnitPrice,
    TotalPrice,
}
