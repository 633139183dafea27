//! Nubras ERP Core API
//!
//! Customers and household groups, quotations, sales orders, returns with
//! refund tracking, invoicing, and the staff workload report, behind the
//! shared-cookie session scheme used across the Nubras apps.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod notifications;
pub mod openapi;
pub mod request_id;
pub mod services;

use axum::{extract::State, middleware, response::Json, routing::get, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
    pub auth: Arc<auth::AuthService>,
}

impl AppState {
    pub fn customer_service(&self) -> Arc<services::customers::CustomerService> {
        self.services.customers.clone()
    }

    pub fn quotation_service(&self) -> Arc<services::quotations::QuotationService> {
        self.services.quotations.clone()
    }

    pub fn order_service(&self) -> Arc<services::orders::OrderService> {
        self.services.orders.clone()
    }

    pub fn return_service(&self) -> Arc<services::returns::ReturnService> {
        self.services.returns.clone()
    }

    pub fn invoicing_service(&self) -> Arc<services::invoicing::InvoicingService> {
        self.services.invoicing.clone()
    }

    pub fn staff_service(&self) -> Arc<services::staff::StaffService> {
        self.services.staff.clone()
    }
}

// Common query parameters for list endpoints
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Search term (endpoints that support it)
    pub search: Option<String>,
    /// Status filter (endpoints that support it)
    pub status: Option<String>,
}

impl ListQuery {
    /// Clamped pagination: 1-indexed page, page size capped at 100.
    pub fn pagination(&self) -> (u64, u64) {
        (self.page.max(1), self.limit.clamp(1, 100))
    }
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: request_id::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        let total_pages = total.div_ceil(limit.max(1));
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// The `/api/v1` surface. Everything except the status and health probes
/// sits behind the shared-session middleware.
pub fn api_v1_routes(auth_service: Arc<auth::AuthService>) -> Router<AppState> {
    let protected = Router::new()
        .merge(handlers::customers::routes())
        .merge(handlers::quotations::routes())
        .merge(handlers::orders::routes())
        .merge(handlers::returns::routes())
        .merge(handlers::invoices::routes())
        .merge(handlers::staff::routes())
        .route_layer(middleware::from_fn_with_state(
            auth_service,
            auth::require_session,
        ));

    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(protected)
}

async fn api_status(State(state): State<AppState>) -> ApiResult<Value> {
    let status_data = json!({
        "status": "ok",
        "service": "nubras-api",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(State(state): State<AppState>) -> ApiResult<Value> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response = request_id::scope_request_id(
            request_id::RequestId::new("meta-123"),
            async { ApiResponse::success("ok") },
        )
        .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[tokio::test]
    async fn error_response_includes_request_metadata() {
        let response = request_id::scope_request_id(
            request_id::RequestId::new("meta-err"),
            async { ApiResponse::<()>::error("oops".into()) },
        )
        .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-err"));
        assert!(!meta.timestamp.is_empty());
    }

    #[test]
    fn pagination_clamps_out_of_range_values() {
        let query = ListQuery {
            page: 0,
            limit: 5000,
            search: None,
            status: None,
        };
        assert_eq!(query.pagination(), (1, 100));
    }

    #[test]
    fn paginated_response_counts_pages() {
        let response = PaginatedResponse::new(vec![1, 2, 3], 41, 1, 20);
        assert_eq!(response.total_pages, 3);

        let response = PaginatedResponse::new(Vec::<i32>::new(), 0, 1, 20);
        assert_eq!(response.total_pages, 0);
    }
}
