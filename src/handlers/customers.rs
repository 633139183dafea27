use crate::{
    entities::{customer, customer_group},
    errors::ServiceError,
    services::customers::{CustomerPatch, NewCustomer},
    ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerSummary {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: String,
    pub group_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<customer::Model> for CustomerSummary {
    fn from(model: customer::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            phone: model.phone,
            address: model.address,
            status: model.status,
            group_id: model.group_id,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerGroupSummary {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

impl From<customer_group::Model> for CustomerGroupSummary {
    fn from(model: customer_group::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            phone: model.phone,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerGroupDetail {
    #[serde(flatten)]
    pub group: CustomerGroupSummary,
    pub members: Vec<CustomerSummary>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCustomerRequest {
    #[validate(length(min = 1, max = 120, message = "Name must be between 1 and 120 characters"))]
    pub name: String,
    #[validate(email(message = "Email must be a valid address"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCustomerRequest {
    #[validate(length(min = 1, max = 120, message = "Name must be between 1 and 120 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "Email must be a valid address"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateGroupRequest {
    #[validate(length(min = 1, max = 120, message = "Name must be between 1 and 120 characters"))]
    pub name: String,
    #[validate(length(min = 1, message = "Phone cannot be empty"))]
    pub phone: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/customers", get(list_customers).post(create_customer))
        .route(
            "/customers/:id",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
        .route("/customers/:id/orders", get(get_customer_orders))
        .route("/customers/:id/returns", get(get_customer_returns))
        .route("/customer-groups", get(list_groups).post(create_group))
        .route("/customer-groups/:id", get(get_group))
}

pub async fn list_customers(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<CustomerSummary>> {
    let (page, limit) = query.pagination();

    let (records, total) = state
        .customer_service()
        .list_customers(page, limit, query.search.as_deref())
        .await?;

    let items = records.into_iter().map(CustomerSummary::from).collect();
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<CustomerSummary> {
    match state.customer_service().get_customer(id).await? {
        Some(model) => Ok(Json(ApiResponse::success(CustomerSummary::from(model)))),
        None => Err(ServiceError::NotFound(format!("Customer {} not found", id))),
    }
}

pub async fn create_customer(
    State(state): State<AppState>,
    Json(payload): Json<CreateCustomerRequest>,
) -> ApiResult<CustomerSummary> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let created = state
        .customer_service()
        .create_customer(NewCustomer {
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            address: payload.address,
            notes: payload.notes,
        })
        .await?;

    Ok(Json(ApiResponse::success(CustomerSummary::from(created))))
}

pub async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCustomerRequest>,
) -> ApiResult<CustomerSummary> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let updated = state
        .customer_service()
        .update_customer(
            id,
            CustomerPatch {
                name: payload.name,
                email: payload.email,
                phone: payload.phone,
                address: payload.address,
                status: payload.status,
                notes: payload.notes,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(CustomerSummary::from(updated))))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.customer_service().delete_customer(id).await?;
    Ok(Json(ApiResponse::success(json!({
        "customer_id": id,
        "deleted": true
    }))))
}

pub async fn get_customer_orders(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<super::orders::OrderSummary>> {
    let orders = state.customer_service().get_customer_orders(id).await?;
    let items = orders
        .into_iter()
        .map(super::orders::OrderSummary::from)
        .collect();
    Ok(Json(ApiResponse::success(items)))
}

pub async fn get_customer_returns(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<super::returns::ReturnSummary>> {
    let returns = state.customer_service().get_customer_returns(id).await?;
    let items = returns
        .into_iter()
        .map(super::returns::ReturnSummary::from)
        .collect();
    Ok(Json(ApiResponse::success(items)))
}

pub async fn list_groups(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<CustomerGroupSummary>> {
    let (page, limit) = query.pagination();

    let (records, total) = state.customer_service().list_groups(page, limit).await?;

    let items = records.into_iter().map(CustomerGroupSummary::from).collect();
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

pub async fn get_group(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<CustomerGroupDetail> {
    match state.customer_service().get_group(id).await? {
        Some((group, members)) => Ok(Json(ApiResponse::success(CustomerGroupDetail {
            group: CustomerGroupSummary::from(group),
            members: members.into_iter().map(CustomerSummary::from).collect(),
        }))),
        None => Err(ServiceError::NotFound(format!(
            "Customer group {} not found",
            id
        ))),
    }
}

pub async fn create_group(
    State(state): State<AppState>,
    Json(payload): Json<CreateGroupRequest>,
) -> ApiResult<CustomerGroupSummary> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let created = state
        .customer_service()
        .create_group(payload.name, payload.phone)
        .await?;

    Ok(Json(ApiResponse::success(CustomerGroupSummary::from(created))))
}
