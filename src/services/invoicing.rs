use crate::{
    db::DbPool,
    entities::{
        invoice,
        invoice::InvoiceStatus,
        invoice_payment, sales_order,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseBackend, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::generate_number;

#[derive(Debug, Clone)]
pub struct PaymentInput {
    pub amount: Decimal,
    pub method: String,
    pub reference: Option<String>,
}

/// Service for issuing invoices and tracking their payments
#[derive(Clone)]
pub struct InvoicingService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl InvoicingService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Issues an invoice for an order, copying its totals. An order keeps
    /// at most one non-void invoice.
    #[instrument(skip(self))]
    pub async fn issue_for_order(
        &self,
        order_id: Uuid,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<invoice::Model, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await?;

        let order = sales_order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let existing = invoice::Entity::find()
            .filter(invoice::Column::OrderId.eq(order_id))
            .filter(invoice::Column::Status.ne(InvoiceStatus::Void.as_str()))
            .one(&txn)
            .await?;
        if let Some(existing) = existing {
            return Err(ServiceError::Conflict(format!(
                "Order {} already has invoice {}",
                order_id, existing.invoice_number
            )));
        }

        let created = invoice::ActiveModel {
            id: Set(Uuid::new_v4()),
            invoice_number: Set(generate_number("INV")),
            order_id: Set(order_id),
            customer_id: Set(order.customer_id),
            status: Set(InvoiceStatus::Issued.as_str().to_owned()),
            total_amount: Set(order.total_amount),
            amount_paid: Set(Decimal::ZERO),
            currency: Set(order.currency.clone()),
            due_date: Set(due_date),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(invoice_id = %created.id, order_id = %order_id, "Invoice issued");
        if let Err(e) = self.event_sender.send(Event::InvoiceIssued(created.id)).await {
            warn!(invoice_id = %created.id, error = %e, "Failed to send invoice issued event");
        }

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_invoice(
        &self,
        invoice_id: Uuid,
    ) -> Result<Option<(invoice::Model, Vec<invoice_payment::Model>)>, ServiceError> {
        let db = &*self.db_pool;

        let Some(record) = invoice::Entity::find_by_id(invoice_id).one(db).await? else {
            return Ok(None);
        };
        let payments = invoice_payment::Entity::find()
            .filter(invoice_payment::Column::InvoiceId.eq(invoice_id))
            .order_by_asc(invoice_payment::Column::CreatedAt)
            .all(db)
            .await?;

        Ok(Some((record, payments)))
    }

    #[instrument(skip(self))]
    pub async fn list_invoices(
        &self,
        page: u64,
        limit: u64,
        status: Option<&str>,
    ) -> Result<(Vec<invoice::Model>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut query = invoice::Entity::find().order_by_desc(invoice::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(invoice::Column::Status.eq(status.to_ascii_lowercase()));
        }

        let paginator = query.paginate(db, limit);
        let total = paginator.num_items().await?;
        let invoices = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((invoices, total))
    }

    /// Records a payment against an open invoice, accumulating the paid
    /// amount and deriving the new status in the same transaction. The
    /// invoice row is locked on Postgres so two cashiers cannot both pass
    /// the balance check.
    #[instrument(skip(self, input), fields(amount = %input.amount))]
    pub async fn record_payment(
        &self,
        invoice_id: Uuid,
        input: PaymentInput,
    ) -> Result<(invoice::Model, invoice_payment::Model), ServiceError> {
        if input.amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Payment amount must be positive".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await?;

        let mut invoice_query = invoice::Entity::find_by_id(invoice_id);
        if db.get_database_backend() == DatabaseBackend::Postgres {
            invoice_query = invoice_query.lock_exclusive();
        }
        let record = invoice_query
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Invoice {} not found", invoice_id)))?;

        let status = parse_status(&record)?;
        if !status.accepts_payment() {
            return Err(ServiceError::Conflict(format!(
                "Invoice {} is {} and cannot accept payments",
                invoice_id, status
            )));
        }

        let new_paid = record.amount_paid + input.amount;
        if new_paid > record.total_amount {
            return Err(ServiceError::ValidationError(format!(
                "Payment of {} exceeds the outstanding balance {}",
                input.amount,
                record.total_amount - record.amount_paid
            )));
        }

        let payment = invoice_payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            invoice_id: Set(invoice_id),
            amount: Set(input.amount),
            method: Set(input.method),
            reference: Set(input.reference),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let next_status = if new_paid == record.total_amount {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::PartiallyPaid
        };

        let mut active: invoice::ActiveModel = record.into();
        active.amount_paid = Set(new_paid);
        active.status = Set(next_status.as_str().to_owned());
        active.updated_at = Set(Some(now));
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        info!(
            invoice_id = %invoice_id,
            payment_id = %payment.id,
            status = %updated.status,
            "Invoice payment recorded"
        );
        if let Err(e) = self
            .event_sender
            .send(Event::InvoicePaymentRecorded {
                invoice_id,
                payment_id: payment.id,
                amount: payment.amount,
            })
            .await
        {
            warn!(invoice_id = %invoice_id, error = %e, "Failed to send payment recorded event");
        }

        Ok((updated, payment))
    }

    /// Voids an invoice that has collected no payments.
    #[instrument(skip(self))]
    pub async fn void_invoice(&self, invoice_id: Uuid) -> Result<invoice::Model, ServiceError> {
        let db = &*self.db_pool;

        let record = invoice::Entity::find_by_id(invoice_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Invoice {} not found", invoice_id)))?;

        let status = parse_status(&record)?;
        if status != InvoiceStatus::Issued {
            return Err(ServiceError::Conflict(format!(
                "Only unpaid issued invoices can be voided; invoice {} is {}",
                invoice_id, status
            )));
        }

        let mut active: invoice::ActiveModel = record.into();
        active.status = Set(InvoiceStatus::Void.as_str().to_owned());
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(db).await?;

        if let Err(e) = self.event_sender.send(Event::InvoiceVoided(invoice_id)).await {
            warn!(invoice_id = %invoice_id, error = %e, "Failed to send invoice voided event");
        }

        Ok(updated)
    }
}

fn parse_status(record: &invoice::Model) -> Result<InvoiceStatus, ServiceError> {
    record.status.parse().map_err(|_| {
        ServiceError::InternalError(format!(
            "Invoice {} has corrupt status '{}'",
            record.id, record.status
        ))
    })
}
