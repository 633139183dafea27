use sea_orm_migration::prelude::*;

use super::m20240301_000001_create_customer_tables::Customers;
use super::m20240301_000002_create_sales_order_tables::SalesOrders;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Invoices::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Invoices::Id).uuid().primary_key().not_null())
                    .col(
                        ColumnDef::new(Invoices::InvoiceNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Invoices::OrderId).uuid().not_null())
                    .col(ColumnDef::new(Invoices::CustomerId).uuid().not_null())
                    .col(
                        ColumnDef::new(Invoices::Status)
                            .string()
                            .not_null()
                            .default("issued"),
                    )
                    .col(ColumnDef::new(Invoices::TotalAmount).decimal().not_null())
                    .col(
                        ColumnDef::new(Invoices::AmountPaid)
                            .decimal()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Invoices::Currency).string().not_null())
                    .col(
                        ColumnDef::new(Invoices::DueDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Invoices::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Invoices::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoices_order_id")
                            .from(Invoices::Table, Invoices::OrderId)
                            .to(SalesOrders::Table, SalesOrders::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoices_customer_id")
                            .from(Invoices::Table, Invoices::CustomerId)
                            .to(Customers::Table, Customers::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InvoicePayments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InvoicePayments::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InvoicePayments::InvoiceId).uuid().not_null())
                    .col(ColumnDef::new(InvoicePayments::Amount).decimal().not_null())
                    .col(ColumnDef::new(InvoicePayments::Method).string().not_null())
                    .col(ColumnDef::new(InvoicePayments::Reference).string().null())
                    .col(
                        ColumnDef::new(InvoicePayments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoice_payments_invoice_id")
                            .from(InvoicePayments::Table, InvoicePayments::InvoiceId)
                            .to(Invoices::Table, Invoices::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InvoicePayments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Invoices::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Invoices {
    Table,
    Id,
    InvoiceNumber,
    OrderId,
    CustomerId,
    Status,
    TotalAmount,
    AmountPaid,
    Currency,
    DueDate,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum InvoicePayments {
    Table,
    Id,
    InvoiceId,
    Amount,
    Method,
    Reference,
    CreatedAt,
}
