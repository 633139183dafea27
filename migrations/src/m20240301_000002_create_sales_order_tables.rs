use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SalesOrders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SalesOrders::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesOrders::OrderNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(SalesOrders::CustomerId).uuid().not_null())
                    .col(
                        ColumnDef::new(SalesOrders::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(SalesOrders::TotalAmount)
                            .decimal()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SalesOrders::Currency).string().not_null())
                    .col(ColumnDef::new(SalesOrders::Notes).text().null())
                    .col(
                        ColumnDef::new(SalesOrders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesOrders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sales_orders_customer_id")
                            .from(SalesOrders::Table, SalesOrders::CustomerId)
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
                    .table(SalesOrderItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SalesOrderItems::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SalesOrderItems::OrderId).uuid().not_null())
                    .col(
                        ColumnDef::new(SalesOrderItems::Description)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesOrderItems::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesOrderItems::UnitPrice)
                            .decimal()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesOrderItems::TotalPrice)
                            .decimal()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sales_order_items_order_id")
                            .from(SalesOrderItems::Table, SalesOrderItems::OrderId)
                            .to(SalesOrders::Table, SalesOrders::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SalesOrderItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SalesOrders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum SalesOrders {
    Table,
    Id,
    OrderNumber,
    CustomerId,
    Status,
    TotalAmount,
    Currency,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum SalesOrderItems {
    Table,
    Id,
    OrderId,
    Description,
    Quantity,
    UnitPrice,
    TotalPrice,
}
