use crate::{
    entities::{quotation, quotation_item},
    errors::ServiceError,
    services::quotations::{NewQuotation, QuotationUpdate, QuoteItemInput},
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

use super::orders::OrderDetail;

#[derive(Debug, Serialize, ToSchema)]
pub struct QuotationSummary {
    pub id: Uuid,
    pub quote_number: String,
    pub customer_id: Uuid,
    pub status: String,
    pub valid_until: Option<DateTime<Utc>>,
    pub total_amount: Decimal,
    pub currency: String,
    pub notes: Option<String>,
    pub converted_order_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<quotation::Model> for QuotationSummary {
    fn from(model: quotation::Model) -> Self {
        Self {
            id: model.id,
            quote_number: model.quote_number,
            customer_id: model.customer_id,
            status: model.status,
            valid_until: model.valid_until,
            total_amount: model.total_amount,
            currency: model.currency,
            notes: model.notes,
            converted_order_id: model.converted_order_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuotationItemSummary {
    pub id: Uuid,
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

impl From<quotation_item::Model> for QuotationItemSummary {
    fn from(model: quotation_item::Model) -> Self {
        Self {
            id: model.id,
            description: model.description,
            quantity: model.quantity,
            unit_price: model.unit_price,
            total_price: model.total_price,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuotationDetail {
    #[serde(flatten)]
    pub quotation: QuotationSummary,
    pub items: Vec<QuotationItemSummary>,
}

impl QuotationDetail {
    fn new(quotation: quotation::Model, items: Vec<quotation_item::Model>) -> Self {
        Self {
            quotation: QuotationSummary::from(quotation),
            items: items.into_iter().map(QuotationItemSummary::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct QuoteItemRequest {
    #[validate(length(min = 1, message = "Description cannot be empty"))]
    pub description: String,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl From<QuoteItemRequest> for QuoteItemInput {
    fn from(item: QuoteItemRequest) -> Self {
        Self {
            description: item.description,
            quantity: item.quantity,
            unit_price: item.unit_price,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateQuotationRequest {
    pub customer_id: Uuid,
    pub quote_number: Option<String>,
    pub currency: Option<String>,
    pub valid_until: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "At least one line item is required"))]
    pub items: Vec<QuoteItemRequest>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateQuotationRequest {
    pub valid_until: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "At least one line item is required"))]
    pub items: Vec<QuoteItemRequest>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/quotations", get(list_quotations).post(create_quotation))
        .route("/quotations/:id", get(get_quotation).put(update_quotation))
        .route("/quotations/:id/send", post(send_quotation))
        .route("/quotations/:id/accept", post(accept_quotation))
        .route("/quotations/:id/reject", post(reject_quotation))
        .route("/quotations/:id/convert", post(convert_quotation))
}

pub async fn list_quotations(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<QuotationSummary>> {
    let (page, limit) = query.pagination();

    let (records, total) = state
        .quotation_service()
        .list_quotations(page, limit, query.status.as_deref())
        .await?;

    let items = records.into_iter().map(QuotationSummary::from).collect();
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

pub async fn get_quotation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<QuotationDetail> {
    match state.quotation_service().get_quotation(id).await? {
        Some((quote, items)) => Ok(Json(ApiResponse::success(QuotationDetail::new(quote, items)))),
        None => Err(ServiceError::NotFound(format!("Quotation {} not found", id))),
    }
}

pub async fn create_quotation(
    State(state): State<AppState>,
    Json(payload): Json<CreateQuotationRequest>,
) -> ApiResult<QuotationDetail> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let (quote, items) = state
        .quotation_service()
        .create_quotation(NewQuotation {
            customer_id: payload.customer_id,
            quote_number: payload.quote_number,
            currency: payload.currency,
            valid_until: payload.valid_until,
            notes: payload.notes,
            items: payload.items.into_iter().map(QuoteItemInput::from).collect(),
        })
        .await?;

    Ok(Json(ApiResponse::success(QuotationDetail::new(quote, items))))
}

/// Replaces the quotation's full item set transactionally.
pub async fn update_quotation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateQuotationRequest>,
) -> ApiResult<QuotationDetail> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let (quote, items) = state
        .quotation_service()
        .update_quotation(
            id,
            QuotationUpdate {
                valid_until: payload.valid_until,
                notes: payload.notes,
                items: payload.items.into_iter().map(QuoteItemInput::from).collect(),
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(QuotationDetail::new(quote, items))))
}

pub async fn send_quotation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<QuotationSummary> {
    let updated = state.quotation_service().send_quotation(id).await?;
    Ok(Json(ApiResponse::success(QuotationSummary::from(updated))))
}

pub async fn accept_quotation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<QuotationSummary> {
    let updated = state.quotation_service().accept_quotation(id).await?;
    Ok(Json(ApiResponse::success(QuotationSummary::from(updated))))
}

pub async fn reject_quotation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<QuotationSummary> {
    let updated = state.quotation_service().reject_quotation(id).await?;
    Ok(Json(ApiResponse::success(QuotationSummary::from(updated))))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConversionResult {
    pub quotation: QuotationSummary,
    pub order: OrderDetail,
}

pub async fn convert_quotation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ConversionResult> {
    let (quote, order) = state.quotation_service().convert_quotation(id).await?;

    let items = state.order_service().get_order_items(order.id).await?;
    let order_detail = {
        use super::orders::{OrderItemSummary, OrderSummary};
        OrderDetail {
            order: OrderSummary::from(order),
            items: items.into_iter().map(OrderItemSummary::from).collect(),
        }
    };

    Ok(Json(ApiResponse::success(ConversionResult {
        quotation: QuotationSummary::from(quote),
        order: order_detail,
    })))
}
