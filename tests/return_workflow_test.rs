//! Return workflow: the over-return guard, status transitions, and refund
//! recording.

mod common;

use axum::http::Method;
use common::{decimal_value, response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

/// Order with 3 × thobe (100.00) and 2 × scarf (40.00).
async fn seed_order(app: &TestApp) -> Value {
    let customer = app.seed_customer("Amal Rahman", Some("0501234567")).await;
    app.seed_order(
        customer["id"].as_str().unwrap(),
        &[("thobe, white", 3, "100.00"), ("scarf", 2, "40.00")],
    )
    .await
}

fn item_id(order: &Value, index: usize) -> String {
    order["items"][index]["id"].as_str().unwrap().to_string()
}

async fn create_return(app: &TestApp, order: &Value, item_index: usize, quantity: i32) -> (u16, Value) {
    let response = app
        .request(
            Method::POST,
            "/api/v1/returns",
            Some(json!({
                "order_id": order["id"],
                "reason": "Fit issue",
                "items": [{ "order_item_id": item_id(order, item_index), "quantity": quantity }],
            })),
        )
        .await;
    let status = response.status().as_u16();
    (status, response_json(response).await)
}

#[tokio::test]
async fn returns_within_the_ordered_quantity_succeed() {
    let app = TestApp::new().await;
    let order = seed_order(&app).await;

    let (status, body) = create_return(&app, &order, 0, 2).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"], "pending");
    assert!(body["data"]["return_number"]
        .as_str()
        .unwrap()
        .starts_with("RT-"));
    // Per-line refund prorated from the unit price.
    assert_eq!(
        decimal_value(&body["data"]["items"][0]["refund_amount"]),
        dec!(200.00)
    );
}

#[tokio::test]
async fn over_returning_in_one_request_is_rejected() {
    let app = TestApp::new().await;
    let order = seed_order(&app).await;

    let (status, body) = create_return(&app, &order, 0, 4).await;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("exceeds"));

    // Nothing was written.
    let response = app.request(Method::GET, "/api/v1/returns", None).await;
    assert_eq!(response_json(response).await["data"]["total"], 0);
}

#[tokio::test]
async fn prior_returns_count_against_the_balance() {
    let app = TestApp::new().await;
    let order = seed_order(&app).await;

    let (status, _) = create_return(&app, &order, 0, 2).await;
    assert_eq!(status, 200);

    // 2 of 3 already held; 2 more exceed the remainder.
    let (status, _) = create_return(&app, &order, 0, 2).await;
    assert_eq!(status, 400);

    // The final unit still fits.
    let (status, _) = create_return(&app, &order, 0, 1).await;
    assert_eq!(status, 200);

    let (status, _) = create_return(&app, &order, 0, 1).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn duplicate_lines_in_one_request_are_summed() {
    let app = TestApp::new().await;
    let order = seed_order(&app).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/returns",
            Some(json!({
                "order_id": order["id"],
                "reason": "Fit issue",
                "items": [
                    { "order_item_id": item_id(&order, 0), "quantity": 2 },
                    { "order_item_id": item_id(&order, 0), "quantity": 2 },
                ],
            })),
        )
        .await;
    assert_eq!(response.status(), 400, "2 + 2 exceeds the 3 ordered");
}

#[tokio::test]
async fn rejected_returns_release_the_balance() {
    let app = TestApp::new().await;
    let order = seed_order(&app).await;

    let (status, body) = create_return(&app, &order, 0, 3).await;
    assert_eq!(status, 200);
    let return_id = body["data"]["id"].as_str().unwrap().to_string();

    // Everything is held.
    let (status, _) = create_return(&app, &order, 0, 1).await;
    assert_eq!(status, 400);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/returns/{}/reject", return_id),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);

    // The rejection freed the full quantity.
    let (status, _) = create_return(&app, &order, 0, 3).await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn approval_and_completion_record_the_refund() {
    let app = TestApp::new().await;
    let order = seed_order(&app).await;

    let (_, body) = create_return(&app, &order, 0, 2).await;
    let return_id = body["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/returns/{}/approve", return_id),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response_json(response).await["data"]["status"], "approved");

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/returns/{}/complete", return_id),
            Some(json!({ "refund_method": "cash" })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(body["data"]["refund_method"], "cash");
    // Defaulted to the line sum.
    assert_eq!(decimal_value(&body["data"]["refund_amount"]), dec!(200.00));
    assert!(body["data"]["refunded_at"].as_str().is_some());
}

#[tokio::test]
async fn refund_overrides_may_only_lower_the_amount() {
    let app = TestApp::new().await;
    let order = seed_order(&app).await;

    let (_, body) = create_return(&app, &order, 0, 2).await;
    let return_id = body["data"]["id"].as_str().unwrap().to_string();

    app.request(
        Method::POST,
        &format!("/api/v1/returns/{}/approve", return_id),
        None,
    )
    .await;

    // Above the line sum: rejected.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/returns/{}/complete", return_id),
            Some(json!({ "refund_amount": "250.00" })),
        )
        .await;
    assert_eq!(response.status(), 400);

    // A partial refund (restocking fee withheld) is fine.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/returns/{}/complete", return_id),
            Some(json!({ "refund_amount": "180.00", "refund_method": "card" })),
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(
        decimal_value(&response_json(response).await["data"]["refund_amount"]),
        dec!(180.00)
    );
}

#[tokio::test]
async fn transitions_outside_the_graph_conflict() {
    let app = TestApp::new().await;
    let order = seed_order(&app).await;

    let (_, body) = create_return(&app, &order, 0, 1).await;
    let return_id = body["data"]["id"].as_str().unwrap().to_string();

    // Pending cannot complete directly.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/returns/{}/complete", return_id),
            Some(json!({})),
        )
        .await;
    assert_eq!(response.status(), 409);

    app.request(
        Method::POST,
        &format!("/api/v1/returns/{}/approve", return_id),
        None,
    )
    .await;

    // Approved cannot be approved or rejected again.
    for action in ["approve", "reject"] {
        let response = app
            .request(
                Method::POST,
                &format!("/api/v1/returns/{}/{}", return_id, action),
                None,
            )
            .await;
        assert_eq!(response.status(), 409, "approved cannot {}", action);
    }
}

#[tokio::test]
async fn validation_failures_are_rejected() {
    let app = TestApp::new().await;
    let order = seed_order(&app).await;

    // Unknown order.
    let response = app
        .request(
            Method::POST,
            "/api/v1/returns",
            Some(json!({
                "order_id": "00000000-0000-0000-0000-000000000001",
                "reason": "Fit issue",
                "items": [{ "order_item_id": item_id(&order, 0), "quantity": 1 }],
            })),
        )
        .await;
    assert_eq!(response.status(), 404);

    // Item from a different order.
    let other_customer = app.seed_customer("Noor Hassan", Some("0559876543")).await;
    let other_order = app
        .seed_order(other_customer["id"].as_str().unwrap(), &[("belt", 1, "30.00")])
        .await;
    let response = app
        .request(
            Method::POST,
            "/api/v1/returns",
            Some(json!({
                "order_id": order["id"],
                "reason": "Fit issue",
                "items": [{ "order_item_id": item_id(&other_order, 0), "quantity": 1 }],
            })),
        )
        .await;
    assert_eq!(response.status(), 400);

    // Empty reason.
    let response = app
        .request(
            Method::POST,
            "/api/v1/returns",
            Some(json!({
                "order_id": order["id"],
                "reason": "",
                "items": [{ "order_item_id": item_id(&order, 0), "quantity": 1 }],
            })),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn cancelled_orders_refuse_returns() {
    let app = TestApp::new().await;
    let order = seed_order(&app).await;
    let order_id = order["id"].as_str().unwrap();

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{}/status", order_id),
            Some(json!({ "status": "cancelled" })),
        )
        .await;
    assert_eq!(response.status(), 200);

    let (status, _) = create_return(&app, &order, 0, 1).await;
    assert_eq!(status, 409);
}

#[tokio::test]
async fn listing_filters_by_status() {
    let app = TestApp::new().await;
    let order = seed_order(&app).await;

    let (_, pending) = create_return(&app, &order, 0, 1).await;
    let (_, second) = create_return(&app, &order, 1, 1).await;
    let approved_id = second["data"]["id"].as_str().unwrap();
    app.request(
        Method::POST,
        &format!("/api/v1/returns/{}/approve", approved_id),
        None,
    )
    .await;

    let response = app
        .request(Method::GET, "/api/v1/returns?status=pending", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["id"], pending["data"]["id"]);

    let response = app
        .request(Method::GET, "/api/v1/returns?status=approved", None)
        .await;
    assert_eq!(response_json(response).await["data"]["total"], 1);
}
