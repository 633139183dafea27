use sea_orm_migration::prelude::*;

use super::m20240301_000001_create_customer_tables::Customers;
use super::m20240301_000002_create_sales_order_tables::{SalesOrderItems, SalesOrders};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SalesReturns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SalesReturns::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesReturns::ReturnNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(SalesReturns::OrderId).uuid().not_null())
                    .col(ColumnDef::new(SalesReturns::CustomerId).uuid().not_null())
                    .col(ColumnDef::new(SalesReturns::Reason).text().not_null())
                    .col(
                        ColumnDef::new(SalesReturns::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(SalesReturns::RefundAmount).decimal().null())
                    .col(ColumnDef::new(SalesReturns::RefundMethod).string().null())
                    .col(
                        ColumnDef::new(SalesReturns::RefundedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SalesReturns::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesReturns::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sales_returns_order_id")
                            .from(SalesReturns::Table, SalesReturns::OrderId)
                            .to(SalesOrders::Table, SalesOrders::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sales_returns_customer_id")
                            .from(SalesReturns::Table, SalesReturns::CustomerId)
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
                    .table(SalesReturnItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SalesReturnItems::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SalesReturnItems::ReturnId).uuid().not_null())
                    .col(
                        ColumnDef::new(SalesReturnItems::OrderItemId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesReturnItems::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesReturnItems::RefundAmount)
                            .decimal()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sales_return_items_return_id")
                            .from(SalesReturnItems::Table, SalesReturnItems::ReturnId)
                            .to(SalesReturns::Table, SalesReturns::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sales_return_items_order_item_id")
                            .from(SalesReturnItems::Table, SalesReturnItems::OrderItemId)
                            .to(SalesOrderItems::Table, SalesOrderItems::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SalesReturnItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SalesReturns::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum SalesReturns {
    Table,
    Id,
    ReturnNumber,
    OrderId,
    CustomerId,
    Reason,
    Status,
    RefundAmount,
    RefundMethod,
    RefundedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum SalesReturnItems {
    Table,
    Id,
    ReturnId,
    OrderItemId,
    Quantity,
    RefundAmount,
}
