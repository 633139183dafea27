use crate::{
    entities::{sales_order, sales_order_item},
    errors::ServiceError,
    services::orders::{NewOrder, OrderItemInput},
    ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderSummary {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub status: String,
    pub total_amount: Decimal,
    pub currency: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<sales_order::Model> for OrderSummary {
    fn from(model: sales_order::Model) -> Self {
        Self {
            id: model.id,
            order_number: model.order_number,
            customer_id: model.customer_id,
            status: model.status,
            total_amount: model.total_amount,
            currency: model.currency,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemSummary {
    pub id: Uuid,
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

impl From<sales_order_item::Model> for OrderItemSummary {
    fn from(model: sales_order_item::Model) -> Self {
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
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: OrderSummary,
    pub items: Vec<OrderItemSummary>,
}

impl OrderDetail {
    fn new(order: sales_order::Model, items: Vec<sales_order_item::Model>) -> Self {
        Self {
            order: OrderSummary::from(order),
            items: items.into_iter().map(OrderItemSummary::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct OrderItemRequest {
    #[validate(length(min = 1, message = "Description cannot be empty"))]
    pub description: String,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    pub customer_id: Uuid,
    pub order_number: Option<String>,
    pub currency: Option<String>,
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "At least one line item is required"))]
    pub items: Vec<OrderItemRequest>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderStatusRequest {
    #[validate(length(min = 1, message = "Status cannot be empty"))]
    pub status: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/items", get(get_order_items))
        .route("/orders/:id/status", put(update_order_status))
        .route("/orders/:id/invoice", post(super::invoices::issue_invoice))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<OrderSummary>> {
    let (page, limit) = query.pagination();

    let (records, total) = state
        .order_service()
        .list_orders(page, limit, query.status.as_deref())
        .await?;

    let items = records.into_iter().map(OrderSummary::from).collect();
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderDetail> {
    match state.order_service().get_order(id).await? {
        Some((order, items)) => Ok(Json(ApiResponse::success(OrderDetail::new(order, items)))),
        None => Err(ServiceError::NotFound(format!("Order {} not found", id))),
    }
}

pub async fn get_order_items(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<OrderItemSummary>> {
    if state.order_service().get_order(id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("Order {} not found", id)));
    }

    let items = state.order_service().get_order_items(id).await?;
    Ok(Json(ApiResponse::success(
        items.into_iter().map(OrderItemSummary::from).collect(),
    )))
}

pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> ApiResult<OrderDetail> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let (order, items) = state
        .order_service()
        .create_order(NewOrder {
            customer_id: payload.customer_id,
            order_number: payload.order_number,
            currency: payload.currency,
            notes: payload.notes,
            items: payload
                .items
                .into_iter()
                .map(|item| OrderItemInput {
                    description: item.description,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                })
                .collect(),
        })
        .await?;

    Ok(Json(ApiResponse::success(OrderDetail::new(order, items))))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> ApiResult<OrderSummary> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let updated = state
        .order_service()
        .update_order_status(id, &payload.status)
        .await?;

    Ok(Json(ApiResponse::success(OrderSummary::from(updated))))
}
