use sea_orm_migration::prelude::*;

use super::m20240301_000001_create_customer_tables::Customers;
use super::m20240301_000002_create_sales_order_tables::{SalesOrderItems, SalesOrders};
use super::m20240301_000003_create_quotation_tables::QuotationItems;
use super::m20240301_000004_create_return_tables::{SalesReturnItems, SalesReturns};
use super::m20240301_000005_create_staff_tables::Projects;
use super::m20240301_000006_create_invoice_tables::InvoicePayments;
use super::m20240301_000007_create_auth_tables::VerificationTokens;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_customers_phone")
                    .table(Customers::Table)
                    .col(Customers::Phone)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_customers_group_id")
                    .table(Customers::Table)
                    .col(Customers::GroupId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sales_orders_customer_id")
                    .table(SalesOrders::Table)
                    .col(SalesOrders::CustomerId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sales_order_items_order_id")
                    .table(SalesOrderItems::Table)
                    .col(SalesOrderItems::OrderId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_quotation_items_quotation_id")
                    .table(QuotationItems::Table)
                    .col(QuotationItems::QuotationId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // The over-return guard scans a given order's returns and their
        // items on every submission.
        manager
            .create_index(
                Index::create()
                    .name("idx_sales_returns_order_id")
                    .table(SalesReturns::Table)
                    .col(SalesReturns::OrderId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sales_return_items_return_id")
                    .table(SalesReturnItems::Table)
                    .col(SalesReturnItems::ReturnId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sales_return_items_order_item_id")
                    .table(SalesReturnItems::Table)
                    .col(SalesReturnItems::OrderItemId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_projects_staff_id_status")
                    .table(Projects::Table)
                    .col(Projects::StaffId)
                    .col(Projects::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_invoice_payments_invoice_id")
                    .table(InvoicePayments::Table)
                    .col(InvoicePayments::InvoiceId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_verification_tokens_identifier")
                    .table(VerificationTokens::Table)
                    .col(VerificationTokens::Identifier)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in [
            "idx_customers_phone",
            "idx_customers_group_id",
            "idx_sales_orders_customer_id",
            "idx_sales_order_items_order_id",
            "idx_quotation_items_quotation_id",
            "idx_sales_returns_order_id",
            "idx_sales_return_items_return_id",
            "idx_sales_return_items_order_item_id",
            "idx_projects_staff_id_status",
            "idx_invoice_payments_invoice_id",
            "idx_verification_tokens_identifier",
        ] {
            manager
                .drop_index(Index::drop().name(name).to_owned())
                .await?;
        }
        Ok(())
    }
}
