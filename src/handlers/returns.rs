use crate::{
    entities::{sales_return, sales_return_item},
    errors::ServiceError,
    services::returns::{CompleteReturn, NewReturn, ReturnItemInput},
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
pub struct ReturnSummary {
    pub id: Uuid,
    pub return_number: String,
    pub order_id: Uuid,
    pub customer_id: Uuid,
    pub status: String,
    pub reason: String,
    pub refund_amount: Option<Decimal>,
    pub refund_method: Option<String>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<sales_return::Model> for ReturnSummary {
    fn from(model: sales_return::Model) -> Self {
        Self {
            id: model.id,
            return_number: model.return_number,
            order_id: model.order_id,
            customer_id: model.customer_id,
            status: model.status,
            reason: model.reason,
            refund_amount: model.refund_amount,
            refund_method: model.refund_method,
            refunded_at: model.refunded_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReturnItemSummary {
    pub id: Uuid,
    pub order_item_id: Uuid,
    pub quantity: i32,
    pub refund_amount: Decimal,
}

impl From<sales_return_item::Model> for ReturnItemSummary {
    fn from(model: sales_return_item::Model) -> Self {
        Self {
            id: model.id,
            order_item_id: model.order_item_id,
            quantity: model.quantity,
            refund_amount: model.refund_amount,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReturnDetail {
    #[serde(flatten)]
    pub sales_return: ReturnSummary,
    pub items: Vec<ReturnItemSummary>,
}

impl ReturnDetail {
    fn new(record: sales_return::Model, items: Vec<sales_return_item::Model>) -> Self {
        Self {
            sales_return: ReturnSummary::from(record),
            items: items.into_iter().map(ReturnItemSummary::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReturnItemRequest {
    pub order_item_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReturnRequest {
    pub order_id: Uuid,
    #[validate(length(min = 1, message = "Reason cannot be empty"))]
    pub reason: String,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<ReturnItemRequest>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CompleteReturnRequest {
    pub refund_method: Option<String>,
    pub refund_amount: Option<Decimal>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/returns", get(list_returns).post(create_return))
        .route("/returns/:id", get(get_return))
        .route("/returns/:id/approve", post(approve_return))
        .route("/returns/:id/reject", post(reject_return))
        .route("/returns/:id/complete", post(complete_return))
}

pub async fn list_returns(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<ReturnSummary>> {
    let (page, limit) = query.pagination();

    let (records, total) = state
        .return_service()
        .list_returns(page, limit, query.status.as_deref())
        .await?;

    let items = records.into_iter().map(ReturnSummary::from).collect();
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

pub async fn get_return(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ReturnDetail> {
    match state.return_service().get_return(id).await? {
        Some((record, items)) => Ok(Json(ApiResponse::success(ReturnDetail::new(record, items)))),
        None => Err(ServiceError::NotFound(format!("Return {} not found", id))),
    }
}

pub async fn create_return(
    State(state): State<AppState>,
    Json(payload): Json<CreateReturnRequest>,
) -> ApiResult<ReturnDetail> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let (record, items) = state
        .return_service()
        .create_return(NewReturn {
            order_id: payload.order_id,
            reason: payload.reason,
            items: payload
                .items
                .into_iter()
                .map(|item| ReturnItemInput {
                    order_item_id: item.order_item_id,
                    quantity: item.quantity,
                })
                .collect(),
        })
        .await?;

    Ok(Json(ApiResponse::success(ReturnDetail::new(record, items))))
}

pub async fn approve_return(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ReturnSummary> {
    let updated = state.return_service().approve_return(id).await?;
    Ok(Json(ApiResponse::success(ReturnSummary::from(updated))))
}

pub async fn reject_return(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ReturnSummary> {
    let updated = state.return_service().reject_return(id).await?;
    Ok(Json(ApiResponse::success(ReturnSummary::from(updated))))
}

pub async fn complete_return(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompleteReturnRequest>,
) -> ApiResult<ReturnSummary> {
    let updated = state
        .return_service()
        .complete_return(
            id,
            CompleteReturn {
                refund_method: payload.refund_method,
                refund_amount: payload.refund_amount,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(ReturnSummary::from(updated))))
}
