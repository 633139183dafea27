use crate::{
    db::DbPool,
    entities::{customer, quotation, quotation_item, sales_order, sales_order_item},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
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
pub struct QuoteItemInput {
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewQuotation {
    pub customer_id: Uuid,
    pub quote_number: Option<String>,
    pub currency: Option<String>,
    pub valid_until: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub items: Vec<QuoteItemInput>,
}

#[derive(Debug, Clone)]
pub struct QuotationUpdate {
    pub valid_until: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub items: Vec<QuoteItemInput>,
}

/// Service for managing pre-sale quotations
#[derive(Clone)]
pub struct QuotationService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    default_currency: String,
}

impl QuotationService {
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

    /// Creates a quotation and its line items in one transaction.
    #[instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn create_quotation(
        &self,
        input: NewQuotation,
    ) -> Result<(quotation::Model, Vec<quotation_item::Model>), ServiceError> {
        validate_quote_items(&input.items)?;

        let db = &*self.db_pool;
        let now = Utc::now();
        let quotation_id = Uuid::new_v4();

        let txn = db.begin().await?;

        customer::Entity::find_by_id(input.customer_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Customer {} not found", input.customer_id))
            })?;

        let quote_number = match input.quote_number {
            Some(number) => {
                if quotation::Entity::find()
                    .filter(quotation::Column::QuoteNumber.eq(number.clone()))
                    .one(&txn)
                    .await?
                    .is_some()
                {
                    return Err(ServiceError::Conflict(format!(
                        "Quote number {} is already in use",
                        number
                    )));
                }
                number
            }
            None => generate_number("QT"),
        };

        let quote = quotation::ActiveModel {
            id: Set(quotation_id),
            quote_number: Set(quote_number),
            customer_id: Set(input.customer_id),
            status: Set(quotation::QuotationStatus::Draft.as_str().to_owned()),
            valid_until: Set(input.valid_until),
            total_amount: Set(items_total(&input.items)),
            currency: Set(input
                .currency
                .unwrap_or_else(|| self.default_currency.clone())),
            notes: Set(input.notes),
            converted_order_id: Set(None),
            created_at: Set(now),
            updated_at: Set(None),
        };
        let quote = quote.insert(&txn).await?;

        insert_items(&txn, quotation_id, &input.items).await?;

        txn.commit().await?;

        let items = self.get_items(quotation_id).await?;

        info!(quotation_id = %quotation_id, quote_number = %quote.quote_number, "Quotation created");
        if let Err(e) = self
            .event_sender
            .send(Event::QuotationCreated(quotation_id))
            .await
        {
            warn!(quotation_id = %quotation_id, error = %e, "Failed to send quotation created event");
        }

        Ok((quote, items))
    }

    /// Replaces the full item set and recomputes the total inside one
    /// transaction; a failure partway rolls back every item change.
    #[instrument(skip(self, update))]
    pub async fn update_quotation(
        &self,
        quotation_id: Uuid,
        update: QuotationUpdate,
    ) -> Result<(quotation::Model, Vec<quotation_item::Model>), ServiceError> {
        validate_quote_items(&update.items)?;

        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let quote = quotation::Entity::find_by_id(quotation_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Quotation {} not found", quotation_id))
            })?;

        let status = parse_status(&quote)?;
        if !status.is_editable() {
            return Err(ServiceError::Conflict(format!(
                "Quotation {} is {} and can no longer be edited",
                quotation_id, status
            )));
        }

        quotation_item::Entity::delete_many()
            .filter(quotation_item::Column::QuotationId.eq(quotation_id))
            .exec(&txn)
            .await?;
        insert_items(&txn, quotation_id, &update.items).await?;

        let mut active: quotation::ActiveModel = quote.into();
        active.total_amount = Set(items_total(&update.items));
        if let Some(valid_until) = update.valid_until {
            active.valid_until = Set(Some(valid_until));
        }
        if let Some(notes) = update.notes {
            active.notes = Set(Some(notes));
        }
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        let items = self.get_items(quotation_id).await?;

        if let Err(e) = self
            .event_sender
            .send(Event::QuotationUpdated(quotation_id))
            .await
        {
            warn!(quotation_id = %quotation_id, error = %e, "Failed to send quotation updated event");
        }

        Ok((updated, items))
    }

    #[instrument(skip(self))]
    pub async fn get_quotation(
        &self,
        quotation_id: Uuid,
    ) -> Result<Option<(quotation::Model, Vec<quotation_item::Model>)>, ServiceError> {
        let db = &*self.db_pool;

        let Some(quote) = quotation::Entity::find_by_id(quotation_id).one(db).await? else {
            return Ok(None);
        };
        let items = self.get_items(quotation_id).await?;

        Ok(Some((quote, items)))
    }

    #[instrument(skip(self))]
    pub async fn list_quotations(
        &self,
        page: u64,
        limit: u64,
        status: Option<&str>,
    ) -> Result<(Vec<quotation::Model>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut query = quotation::Entity::find().order_by_desc(quotation::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(quotation::Column::Status.eq(status.to_ascii_lowercase()));
        }

        let paginator = query.paginate(db, limit);
        let total = paginator.num_items().await?;
        let quotes = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((quotes, total))
    }

    #[instrument(skip(self))]
    pub async fn send_quotation(&self, quotation_id: Uuid) -> Result<quotation::Model, ServiceError> {
        self.transition(quotation_id, quotation::QuotationStatus::Sent)
            .await
    }

    #[instrument(skip(self))]
    pub async fn accept_quotation(
        &self,
        quotation_id: Uuid,
    ) -> Result<quotation::Model, ServiceError> {
        self.transition(quotation_id, quotation::QuotationStatus::Accepted)
            .await
    }

    #[instrument(skip(self))]
    pub async fn reject_quotation(
        &self,
        quotation_id: Uuid,
    ) -> Result<quotation::Model, ServiceError> {
        self.transition(quotation_id, quotation::QuotationStatus::Rejected)
            .await
    }

    /// Converts an accepted quotation into a sales order: order header and
    /// items are written and the quotation is marked converted, all in one
    /// transaction.
    #[instrument(skip(self))]
    pub async fn convert_quotation(
        &self,
        quotation_id: Uuid,
    ) -> Result<(quotation::Model, sales_order::Model), ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await?;

        let quote = quotation::Entity::find_by_id(quotation_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Quotation {} not found", quotation_id))
            })?;

        let status = parse_status(&quote)?;
        if status == quotation::QuotationStatus::Converted {
            return Err(ServiceError::Conflict(format!(
                "Quotation {} has already been converted",
                quotation_id
            )));
        }
        if !status.can_transition_to(quotation::QuotationStatus::Converted) {
            return Err(ServiceError::Conflict(format!(
                "Only accepted quotations can be converted; quotation {} is {}",
                quotation_id, status
            )));
        }

        let quote_items = quotation_item::Entity::find()
            .filter(quotation_item::Column::QuotationId.eq(quotation_id))
            .all(&txn)
            .await?;
        if quote_items.is_empty() {
            return Err(ServiceError::InvalidOperation(format!(
                "Quotation {} has no line items to convert",
                quotation_id
            )));
        }

        let order_id = Uuid::new_v4();
        let order = sales_order::ActiveModel {
            id: Set(order_id),
            order_number: Set(generate_number("SO")),
            customer_id: Set(quote.customer_id),
            status: Set(sales_order::OrderStatus::Pending.as_str().to_owned()),
            total_amount: Set(quote.total_amount),
            currency: Set(quote.currency.clone()),
            notes: Set(quote.notes.clone()),
            created_at: Set(now),
            updated_at: Set(None),
        };
        let order = order.insert(&txn).await?;

        let order_items: Vec<sales_order_item::ActiveModel> = quote_items
            .iter()
            .map(|item| sales_order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                description: Set(item.description.clone()),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                total_price: Set(item.total_price),
            })
            .collect();
        sales_order_item::Entity::insert_many(order_items)
            .exec(&txn)
            .await?;

        let old_status = quote.status.clone();
        let mut active: quotation::ActiveModel = quote.into();
        active.status = Set(quotation::QuotationStatus::Converted.as_str().to_owned());
        active.converted_order_id = Set(Some(order_id));
        active.updated_at = Set(Some(now));
        let converted = active.update(&txn).await?;

        txn.commit().await?;

        info!(
            quotation_id = %quotation_id,
            order_id = %order_id,
            from = %old_status,
            "Quotation converted to sales order"
        );
        if let Err(e) = self
            .event_sender
            .send(Event::QuotationConverted {
                quotation_id,
                order_id,
            })
            .await
        {
            warn!(quotation_id = %quotation_id, error = %e, "Failed to send quotation converted event");
        }

        Ok((converted, order))
    }

    async fn transition(
        &self,
        quotation_id: Uuid,
        next: quotation::QuotationStatus,
    ) -> Result<quotation::Model, ServiceError> {
        let db = &*self.db_pool;

        let quote = quotation::Entity::find_by_id(quotation_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Quotation {} not found", quotation_id))
            })?;

        let current = parse_status(&quote)?;
        if !current.can_transition_to(next) {
            return Err(ServiceError::Conflict(format!(
                "Quotation {} cannot move from {} to {}",
                quotation_id, current, next
            )));
        }

        let old_status = quote.status.clone();
        let mut active: quotation::ActiveModel = quote.into();
        active.status = Set(next.as_str().to_owned());
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(db).await?;

        if let Err(e) = self
            .event_sender
            .send(Event::QuotationStatusChanged {
                quotation_id,
                old_status,
                new_status: updated.status.clone(),
            })
            .await
        {
            warn!(quotation_id = %quotation_id, error = %e, "Failed to send quotation status event");
        }

        Ok(updated)
    }

    async fn get_items(
        &self,
        quotation_id: Uuid,
    ) -> Result<Vec<quotation_item::Model>, ServiceError> {
        let db = &*self.db_pool;
        Ok(quotation_item::Entity::find()
            .filter(quotation_item::Column::QuotationId.eq(quotation_id))
            .all(db)
            .await?)
    }
}

fn parse_status(quote: &quotation::Model) -> Result<quotation::QuotationStatus, ServiceError> {
    quote.status.parse().map_err(|_| {
        ServiceError::InternalError(format!(
            "Quotation {} has corrupt status '{}'",
            quote.id, quote.status
        ))
    })
}

fn items_total(items: &[QuoteItemInput]) -> Decimal {
    items
        .iter()
        .map(|item| line_total(item.quantity, item.unit_price))
        .sum()
}

fn validate_quote_items(items: &[QuoteItemInput]) -> Result<(), ServiceError> {
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

async fn insert_items<C: ConnectionTrait>(
    conn: &C,
    quotation_id: Uuid,
    items: &[QuoteItemInput],
) -> Result<(), ServiceError> {
    let models: Vec<quotation_item::ActiveModel> = items
        .iter()
        .map(|item| quotation_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            quotation_id: Set(quotation_id),
            description: Set(item.description.clone()),
            quantity: Set(item.quantity),
            unit_price: Set(item.unit_price),
            total_price: Set(line_total(item.quantity, item.unit_price)),
        })
        .collect();
    quotation_item::Entity::insert_many(models).exec(conn).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn totals_sum_across_lines() {
        let items = vec![
            QuoteItemInput {
                description: "abaya, silk".into(),
                quantity: 2,
                unit_price: dec!(350.00),
            },
            QuoteItemInput {
                description: "alterations".into(),
                quantity: 1,
                unit_price: dec!(45.50),
            },
        ];
        assert_eq!(items_total(&items), dec!(745.50));
    }
}
