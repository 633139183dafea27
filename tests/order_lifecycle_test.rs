//! Sales order creation and guarded status transitions.

mod common;

use axum::http::Method;
use common::{decimal_value, response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

async fn seed(app: &TestApp) -> Value {
    let customer = app.seed_customer("Amal Rahman", Some("0501234567")).await;
    app.seed_order(
        customer["id"].as_str().unwrap(),
        &[("thobe, white", 2, "100.00"), ("scarf", 1, "40.00")],
    )
    .await
}

async fn set_status(app: &TestApp, order_id: &str, status: &str) -> u16 {
    app.request(
        Method::PUT,
        &format!("/api/v1/orders/{}/status", order_id),
        Some(json!({ "status": status })),
    )
    .await
    .status()
    .as_u16()
}

#[tokio::test]
async fn creation_computes_totals_and_defaults() {
    let app = TestApp::new().await;
    let order = seed(&app).await;

    assert_eq!(order["status"], "pending");
    assert!(order["order_number"].as_str().unwrap().starts_with("SO-"));
    assert_eq!(order["currency"], "AED");
    assert_eq!(decimal_value(&order["total_amount"]), dec!(240.00));
    assert_eq!(order["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn lifecycle_walks_forward_only() {
    let app = TestApp::new().await;
    let order = seed(&app).await;
    let id = order["id"].as_str().unwrap();

    // Skipping ahead is a conflict.
    assert_eq!(set_status(&app, id, "completed").await, 409);

    for status in ["confirmed", "in_progress", "completed"] {
        assert_eq!(set_status(&app, id, status).await, 200, "to {}", status);
    }

    // Terminal states stay put.
    assert_eq!(set_status(&app, id, "in_progress").await, 409);
    assert_eq!(set_status(&app, id, "cancelled").await, 409);
}

#[tokio::test]
async fn cancellation_works_from_any_open_state() {
    let app = TestApp::new().await;
    let order = seed(&app).await;
    let id = order["id"].as_str().unwrap();

    assert_eq!(set_status(&app, id, "confirmed").await, 200);
    assert_eq!(set_status(&app, id, "cancelled").await, 200);

    let response = app
        .request(Method::GET, &format!("/api/v1/orders/{}", id), None)
        .await;
    assert_eq!(response_json(response).await["data"]["status"], "cancelled");
}

#[tokio::test]
async fn unknown_statuses_fail_validation() {
    let app = TestApp::new().await;
    let order = seed(&app).await;
    let id = order["id"].as_str().unwrap();

    assert_eq!(set_status(&app, id, "teleported").await, 400);
}

#[tokio::test]
async fn empty_item_lists_are_rejected() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Amal Rahman", Some("0501234567")).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({ "customer_id": customer["id"], "items": [] })),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn explicit_order_numbers_must_be_unique() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Amal Rahman", Some("0501234567")).await;

    let payload = json!({
        "customer_id": customer["id"],
        "order_number": "SO-FIXED001",
        "items": [{ "description": "thobe", "quantity": 1, "unit_price": "100.00" }],
    });

    let response = app
        .request(Method::POST, "/api/v1/orders", Some(payload.clone()))
        .await;
    assert_eq!(response.status(), 200);

    let response = app.request(Method::POST, "/api/v1/orders", Some(payload)).await;
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn customer_order_history_is_exposed() {
    let app = TestApp::new().await;
    let order = seed(&app).await;
    let customer_id = order["customer_id"].as_str().unwrap();

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/customers/{}/orders", customer_id),
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["id"], order["id"]);
}
