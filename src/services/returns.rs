use crate::{
    db::DbPool,
    entities::{
        sales_order, sales_order_item, sales_return,
        sales_return::ReturnStatus,
        sales_return_item,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseBackend, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::generate_number;

#[derive(Debug, Clone)]
pub struct ReturnItemInput {
    pub order_item_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct NewReturn {
    pub order_id: Uuid,
    pub reason: String,
    pub items: Vec<ReturnItemInput>,
}

#[derive(Debug, Clone, Default)]
pub struct CompleteReturn {
    pub refund_method: Option<String>,
    pub refund_amount: Option<Decimal>,
}

/// Service for managing sales returns
#[derive(Clone)]
pub struct ReturnService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl ReturnService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a return request after checking the order's returnable
    /// balance. The whole check-and-insert runs in one transaction; on
    /// Postgres the order row is locked first so concurrent submissions
    /// against the same order serialize instead of both passing the count.
    /// SQLite's single-writer transactions give the same effect there.
    #[instrument(skip(self, input), fields(order_id = %input.order_id))]
    pub async fn create_return(
        &self,
        input: NewReturn,
    ) -> Result<(sales_return::Model, Vec<sales_return_item::Model>), ServiceError> {
        if input.reason.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Reason cannot be empty".to_string(),
            ));
        }
        if input.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "At least one item is required".to_string(),
            ));
        }
        for item in &input.items {
            if item.quantity < 1 {
                return Err(ServiceError::ValidationError(format!(
                    "Return quantity for order item {} must be at least 1",
                    item.order_item_id
                )));
            }
        }

        let db = &*self.db_pool;
        let now = Utc::now();
        let return_id = Uuid::new_v4();

        let txn = db.begin().await?;

        let mut order_query = sales_order::Entity::find_by_id(input.order_id);
        if db.get_database_backend() == DatabaseBackend::Postgres {
            order_query = order_query.lock_exclusive();
        }
        let order = order_query.one(&txn).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("Order {} not found", input.order_id))
        })?;

        if order.status == sales_order::OrderStatus::Cancelled.as_str() {
            return Err(ServiceError::Conflict(format!(
                "Order {} is cancelled and cannot accept returns",
                input.order_id
            )));
        }

        let order_items = sales_order_item::Entity::find()
            .filter(sales_order_item::Column::OrderId.eq(input.order_id))
            .all(&txn)
            .await?;
        let ordered: BTreeMap<Uuid, &sales_order_item::Model> =
            order_items.iter().map(|item| (item.id, item)).collect();

        // Duplicate lines for the same order item count as one request.
        let mut requested: BTreeMap<Uuid, i32> = BTreeMap::new();
        for item in &input.items {
            if !ordered.contains_key(&item.order_item_id) {
                return Err(ServiceError::ValidationError(format!(
                    "Order item {} does not belong to order {}",
                    item.order_item_id, input.order_id
                )));
            }
            *requested.entry(item.order_item_id).or_insert(0) += item.quantity;
        }

        let already_returned = self
            .returned_quantities(&txn, input.order_id)
            .await?;

        for (order_item_id, quantity) in &requested {
            let ordered_qty = ordered[order_item_id].quantity;
            let returned_qty = already_returned.get(order_item_id).copied().unwrap_or(0);
            if returned_qty + quantity > ordered_qty {
                return Err(ServiceError::InvalidOperation(format!(
                    "Return quantity for order item {} exceeds the remaining balance: ordered {}, already returned {}, requested {}",
                    order_item_id, ordered_qty, returned_qty, quantity
                )));
            }
        }

        let created = sales_return::ActiveModel {
            id: Set(return_id),
            return_number: Set(generate_number("RT")),
            order_id: Set(input.order_id),
            customer_id: Set(order.customer_id),
            reason: Set(input.reason),
            status: Set(ReturnStatus::Pending.as_str().to_owned()),
            refund_amount: Set(None),
            refund_method: Set(None),
            refunded_at: Set(None),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(&txn)
        .await?;

        let item_models: Vec<sales_return_item::ActiveModel> = requested
            .iter()
            .map(|(order_item_id, quantity)| {
                let unit_price = ordered[order_item_id].unit_price;
                sales_return_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    return_id: Set(return_id),
                    order_item_id: Set(*order_item_id),
                    quantity: Set(*quantity),
                    refund_amount: Set(unit_price * Decimal::from(*quantity)),
                }
            })
            .collect();
        sales_return_item::Entity::insert_many(item_models)
            .exec(&txn)
            .await?;

        txn.commit().await?;

        let items = self.get_items(return_id).await?;

        info!(
            return_id = %return_id,
            return_number = %created.return_number,
            "Return request created"
        );
        if let Err(e) = self.event_sender.send(Event::ReturnCreated(return_id)).await {
            warn!(return_id = %return_id, error = %e, "Failed to send return created event");
        }

        Ok((created, items))
    }

    /// Quantities already held per order item by this order's non-rejected
    /// returns.
    async fn returned_quantities<C: ConnectionTrait>(
        &self,
        conn: &C,
        order_id: Uuid,
    ) -> Result<BTreeMap<Uuid, i32>, ServiceError> {
        let prior_items = sales_return_item::Entity::find()
            .join(JoinType::InnerJoin, sales_return_item::Relation::Return.def())
            .filter(sales_return::Column::OrderId.eq(order_id))
            .filter(sales_return::Column::Status.ne(ReturnStatus::Rejected.as_str()))
            .all(conn)
            .await?;

        let mut totals: BTreeMap<Uuid, i32> = BTreeMap::new();
        for item in prior_items {
            *totals.entry(item.order_item_id).or_insert(0) += item.quantity;
        }
        Ok(totals)
    }

    #[instrument(skip(self))]
    pub async fn get_return(
        &self,
        return_id: Uuid,
    ) -> Result<Option<(sales_return::Model, Vec<sales_return_item::Model>)>, ServiceError> {
        let db = &*self.db_pool;

        let Some(record) = sales_return::Entity::find_by_id(return_id).one(db).await? else {
            return Ok(None);
        };
        let items = self.get_items(return_id).await?;

        Ok(Some((record, items)))
    }

    #[instrument(skip(self))]
    pub async fn list_returns(
        &self,
        page: u64,
        limit: u64,
        status: Option<&str>,
    ) -> Result<(Vec<sales_return::Model>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut query = sales_return::Entity::find().order_by_desc(sales_return::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(sales_return::Column::Status.eq(status.to_ascii_lowercase()));
        }

        let paginator = query.paginate(db, limit);
        let total = paginator.num_items().await?;
        let returns = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((returns, total))
    }

    #[instrument(skip(self))]
    pub async fn approve_return(&self, return_id: Uuid) -> Result<sales_return::Model, ServiceError> {
        let updated = self.transition(return_id, ReturnStatus::Approved).await?;
        if let Err(e) = self.event_sender.send(Event::ReturnApproved(return_id)).await {
            warn!(return_id = %return_id, error = %e, "Failed to send return approved event");
        }
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn reject_return(&self, return_id: Uuid) -> Result<sales_return::Model, ServiceError> {
        let updated = self.transition(return_id, ReturnStatus::Rejected).await?;
        if let Err(e) = self.event_sender.send(Event::ReturnRejected(return_id)).await {
            warn!(return_id = %return_id, error = %e, "Failed to send return rejected event");
        }
        Ok(updated)
    }

    /// Completes an approved return and records the refund. The refund
    /// defaults to the sum of the line amounts; a caller override may only
    /// lower it.
    #[instrument(skip(self, input))]
    pub async fn complete_return(
        &self,
        return_id: Uuid,
        input: CompleteReturn,
    ) -> Result<sales_return::Model, ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let record = sales_return::Entity::find_by_id(return_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Return {} not found", return_id)))?;

        let current = parse_status(&record)?;
        if !current.can_transition_to(ReturnStatus::Completed) {
            return Err(ServiceError::Conflict(format!(
                "Return {} cannot move from {} to completed",
                return_id, current
            )));
        }

        let line_sum: Decimal = sales_return_item::Entity::find()
            .filter(sales_return_item::Column::ReturnId.eq(return_id))
            .all(&txn)
            .await?
            .iter()
            .map(|item| item.refund_amount)
            .sum();

        let refund_amount = match input.refund_amount {
            Some(amount) if amount > line_sum => {
                return Err(ServiceError::ValidationError(format!(
                    "Refund amount {} exceeds the returned line total {}",
                    amount, line_sum
                )));
            }
            Some(amount) if amount < Decimal::ZERO => {
                return Err(ServiceError::ValidationError(
                    "Refund amount cannot be negative".to_string(),
                ));
            }
            Some(amount) => amount,
            None => line_sum,
        };

        let now = Utc::now();
        let mut active: sales_return::ActiveModel = record.into();
        active.status = Set(ReturnStatus::Completed.as_str().to_owned());
        active.refund_amount = Set(Some(refund_amount));
        active.refund_method = Set(input.refund_method);
        active.refunded_at = Set(Some(now));
        active.updated_at = Set(Some(now));
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        info!(return_id = %return_id, refund = %refund_amount, "Return completed");
        if let Err(e) = self
            .event_sender
            .send(Event::ReturnCompleted {
                return_id,
                refund_amount,
            })
            .await
        {
            warn!(return_id = %return_id, error = %e, "Failed to send return completed event");
        }

        Ok(updated)
    }

    async fn transition(
        &self,
        return_id: Uuid,
        next: ReturnStatus,
    ) -> Result<sales_return::Model, ServiceError> {
        let db = &*self.db_pool;

        let record = sales_return::Entity::find_by_id(return_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Return {} not found", return_id)))?;

        let current = parse_status(&record)?;
        if !current.can_transition_to(next) {
            return Err(ServiceError::Conflict(format!(
                "Return {} cannot move from {} to {}",
                return_id, current, next
            )));
        }

        let mut active: sales_return::ActiveModel = record.into();
        active.status = Set(next.as_str().to_owned());
        active.updated_at = Set(Some(Utc::now()));

        Ok(active.update(db).await?)
    }

    async fn get_items(
        &self,
        return_id: Uuid,
    ) -> Result<Vec<sales_return_item::Model>, ServiceError> {
        let db = &*self.db_pool;
        Ok(sales_return_item::Entity::find()
            .filter(sales_return_item::Column::ReturnId.eq(return_id))
            .all(db)
            .await?)
    }
}

fn parse_status(record: &sales_return::Model) -> Result<ReturnStatus, ServiceError> {
    record.status.parse().map_err(|_| {
        ServiceError::InternalError(format!(
            "Return {} has corrupt status '{}'",
            record.id, record.status
        ))
    })
}
