use crate::{
    db::DbPool,
    entities::{customer, sales_order, sales_order_item},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{generate_number, line_total};

#[derive(Debug, Clone)]
pub struct OrderItemInput {
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: Uuid,
    pub order_number: Option<String>,
    pub currency: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<OrderItemInput>,
}

/// Service for managing sales orders
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    default_currency: String,
}

impl OrderService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        default_currency: String,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            default_currency,
        }
    }

    /// Creates an order and its line items in one transaction. Totals are
    /// computed server-side from quantity and unit price.
    #[instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn create_order(
        &self,
        input: NewOrder,
    ) -> Result<(sales_order::Model, Vec<sales_order_item::Model>), ServiceError> {
        validate_items(&input.items)?;

        let db = &*self.db_pool;
        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let txn = db.begin().await?;

        customer::Entity::find_by_id(input.customer_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Customer {} not found", input.customer_id))
            })?;

        let order_number = match input.order_number {
            Some(number) => {
                ensure_number_free(&txn, &number).await?;
                number
            }
            None => generate_number("SO"),
        };

        let total_amount: Decimal = input
            .items
            .iter()
            .map(|item| line_total(item.quantity, item.unit_price))
            .sum();

        let order = sales_order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number),
            customer_id: Set(input.customer_id),
            status: Set(sales_order::OrderStatus::Pending.as_str().to_owned()),
            total_amount: Set(total_amount),
            currency: Set(input
                .currency
                .unwrap_or_else(|| self.default_currency.clone())),
            notes: Set(input.notes),
            created_at: Set(now),
            updated_at: Set(None),
        };
        let order = order.insert(&txn).await?;

        let item_models: Vec<sales_order_item::ActiveModel> = input
            .items
            .iter()
            .map(|item| sales_order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                description: Set(item.description.clone()),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                total_price: Set(line_total(item.quantity, item.unit_price)),
            })
            .collect();
        sales_order_item::Entity::insert_many(item_models)
            .exec(&txn)
            .await?;

        txn.commit().await?;

        let items = self.get_order_items(order_id).await?;

        info!(order_id = %order_id, order_number = %order.order_number, "Sales order created");
        if let Err(e) = self.event_sender.send(Event::OrderCreated(order_id)).await {
            warn!(order_id = %order_id, error = %e, "Failed to send order created event");
        }

        Ok((order, items))
    }

    #[instrument(skip(self))]
    pub async fn get_order(
        &self,
        order_id: Uuid,
    ) -> Result<Option<(sales_order::Model, Vec<sales_order_item::Model>)>, ServiceError> {
        let db = &*self.db_pool;

        let Some(order) = sales_order::Entity::find_by_id(order_id).one(db).await? else {
            return Ok(None);
        };
        let items = self.get_order_items(order_id).await?;

        Ok(Some((order, items)))
    }

    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        page: u64,
        limit: u64,
        status: Option<&str>,
    ) -> Result<(Vec<sales_order::Model>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut query = sales_order::Entity::find().order_by_desc(sales_order::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(sales_order::Column::Status.eq(status.to_ascii_lowercase()));
        }

        let paginator = query.paginate(db, limit);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((orders, total))
    }

    #[instrument(skip(self))]
    pub async fn get_order_items(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<sales_order_item::Model>, ServiceError> {
        let db = &*self.db_pool;
        Ok(sales_order_item::Entity::find()
            .filter(sales_order_item::Column::OrderId.eq(order_id))
            .all(db)
            .await?)
    }

    /// Moves an order along its lifecycle; edges outside the allowed
    /// transition graph are conflicts.
    #[instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        order_id: Uuid,
        new_status: &str,
    ) -> Result<sales_order::Model, ServiceError> {
        let next: sales_order::OrderStatus = new_status
            .parse()
            .map_err(|_| ServiceError::InvalidStatus(format!("Unknown order status '{}'", new_status)))?;

        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let order = sales_order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let current: sales_order::OrderStatus = order.status.parse().map_err(|_| {
            ServiceError::InternalError(format!("Order {} has corrupt status '{}'", order_id, order.status))
        })?;

        if !current.can_transition_to(next) {
            return Err(ServiceError::Conflict(format!(
                "Order {} cannot move from {} to {}",
                order_id, current, next
            )));
        }

        let old_status = order.status.clone();
        let mut active: sales_order::ActiveModel = order.into();
        active.status = Set(next.as_str().to_owned());
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        info!(order_id = %order_id, from = %old_status, to = %updated.status, "Order status changed");
        if let Err(e) = self
            .event_sender
            .send(Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status: updated.status.clone(),
            })
            .await
        {
            warn!(order_id = %order_id, error = %e, "Failed to send order status event");
        }

        Ok(updated)
    }
}

pub(crate) fn validate_items(items: &[OrderItemInput]) -> Result<(), ServiceError> {
    if items.is_empty() {
        return Err(ServiceError::ValidationError(
            "At least one line item is required".to_string(),
        ));
    }
    for item in items {
        if item.quantity < 1 {
            return Err(ServiceError::ValidationError(format!(
                "Quantity for '{}' must be at least 1",
                item.description
            )));
        }
        if item.unit_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "Unit price for '{}' cannot be negative",
                item.description
            )));
        }
    }
    Ok(())
}

async fn ensure_number_free<C: ConnectionTrait>(
    conn: &C,
    order_number: &str,
) -> Result<(), ServiceError> {
    if sales_order::Entity::find()
        .filter(sales_order::Column::OrderNumber.eq(order_number))
        .one(conn)
        .await?
        .is_some()
    {
        return Err(ServiceError::Conflict(format!(
            "Order number {} is already in use",
            order_number
        )));
    }
    Ok(())
}
