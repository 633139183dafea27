use crate::{
    entities::{invoice, invoice_payment},
    errors::ServiceError,
    services::invoicing::PaymentInput,
    ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceSummary {
    pub id: Uuid,
    pub invoice_number: String,
    pub order_id: Uuid,
    pub customer_id: Uuid,
    pub status: String,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    pub currency: String,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<invoice::Model> for InvoiceSummary {
    fn from(model: invoice::Model) -> Self {
        Self {
            id: model.id,
            invoice_number: model.invoice_number,
            order_id: model.order_id,
            customer_id: model.customer_id,
            status: model.status,
            total_amount: model.total_amount,
            amount_paid: model.amount_paid,
            currency: model.currency,
            due_date: model.due_date,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentSummary {
    pub id: Uuid,
    pub amount: Decimal,
    pub method: String,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<invoice_payment::Model> for PaymentSummary {
    fn from(model: invoice_payment::Model) -> Self {
        Self {
            id: model.id,
            amount: model.amount,
            method: model.method,
            reference: model.reference,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: InvoiceSummary,
    pub payments: Vec<PaymentSummary>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct IssueInvoiceRequest {
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RecordPaymentRequest {
    pub amount: Decimal,
    #[validate(length(min = 1, message = "Method cannot be empty"))]
    pub method: String,
    pub reference: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentResult {
    pub invoice: InvoiceSummary,
    pub payment: PaymentSummary,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/invoices", get(list_invoices))
        .route("/invoices/:id", get(get_invoice))
        .route("/invoices/:id/payments", post(record_payment))
        .route("/invoices/:id/void", post(void_invoice))
}

/// Mounted under `/orders/:id/invoice`.
pub async fn issue_invoice(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    payload: Option<Json<IssueInvoiceRequest>>,
) -> ApiResult<InvoiceSummary> {
    let due_date = payload.and_then(|Json(p)| p.due_date);

    let created = state
        .invoicing_service()
        .issue_for_order(order_id, due_date)
        .await?;

    Ok(Json(ApiResponse::success(InvoiceSummary::from(created))))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<InvoiceSummary>> {
    let (page, limit) = query.pagination();

    let (records, total) = state
        .invoicing_service()
        .list_invoices(page, limit, query.status.as_deref())
        .await?;

    let items = records.into_iter().map(InvoiceSummary::from).collect();
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<InvoiceDetail> {
    match state.invoicing_service().get_invoice(id).await? {
        Some((record, payments)) => Ok(Json(ApiResponse::success(InvoiceDetail {
            invoice: InvoiceSummary::from(record),
            payments: payments.into_iter().map(PaymentSummary::from).collect(),
        }))),
        None => Err(ServiceError::NotFound(format!("Invoice {} not found", id))),
    }
}

pub async fn record_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordPaymentRequest>,
) -> ApiResult<PaymentResult> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let (invoice, payment) = state
        .invoicing_service()
        .record_payment(
            id,
            PaymentInput {
                amount: payload.amount,
                method: payload.method,
                reference: payload.reference,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(PaymentResult {
        invoice: InvoiceSummary::from(invoice),
        payment: PaymentSummary::from(payment),
    })))
}

pub async fn void_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<InvoiceSummary> {
    let updated = state.invoicing_service().void_invoice(id).await?;
    Ok(Json(ApiResponse::success(InvoiceSummary::from(updated))))
}
