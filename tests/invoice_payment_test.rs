//! Invoicing: one active invoice per order, payment accumulation, and the
//! derived status.

mod common;

use axum::http::Method;
use common::{decimal_value, response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

/// Order totaling 500.00, with its invoice issued.
async fn seed_invoice(app: &TestApp) -> Value {
    let customer = app.seed_customer("Amal Rahman", Some("0501234567")).await;
    let order = app
        .seed_order(
            customer["id"].as_str().unwrap(),
            &[("kandura, bespoke", 2, "250.00")],
        )
        .await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{}/invoice", order["id"].as_str().unwrap()),
            None,
        )
        .await;
    assert_eq!(response.status(), 200, "invoice issue should succeed");
    response_json(response).await["data"].clone()
}

async fn pay(app: &TestApp, invoice_id: &str, amount: &str) -> (u16, Value) {
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/invoices/{}/payments", invoice_id),
            Some(json!({ "amount": amount, "method": "card" })),
        )
        .await;
    let status = response.status().as_u16();
    (status, response_json(response).await)
}

#[tokio::test]
async fn issuing_copies_the_order_totals() {
    let app = TestApp::new().await;
    let invoice = seed_invoice(&app).await;

    assert_eq!(invoice["status"], "issued");
    assert!(invoice["invoice_number"].as_str().unwrap().starts_with("INV-"));
    assert_eq!(decimal_value(&invoice["total_amount"]), dec!(500.00));
    assert_eq!(decimal_value(&invoice["amount_paid"]), dec!(0));
}

#[tokio::test]
async fn an_order_keeps_one_active_invoice() {
    let app = TestApp::new().await;
    let invoice = seed_invoice(&app).await;
    let order_id = invoice["order_id"].as_str().unwrap();

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{}/invoice", order_id),
            None,
        )
        .await;
    assert_eq!(response.status(), 409);

    // Voiding frees the slot for a reissue.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/invoices/{}/void", invoice["id"].as_str().unwrap()),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{}/invoice", order_id),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn payments_accumulate_to_paid_exactly_at_the_balance() {
    let app = TestApp::new().await;
    let invoice = seed_invoice(&app).await;
    let id = invoice["id"].as_str().unwrap();

    let (status, body) = pay(&app, id, "200.00").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["invoice"]["status"], "partially_paid");
    assert_eq!(
        decimal_value(&body["data"]["invoice"]["amount_paid"]),
        dec!(200.00)
    );

    let (status, body) = pay(&app, id, "300.00").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["invoice"]["status"], "paid");
    assert_eq!(
        decimal_value(&body["data"]["invoice"]["amount_paid"]),
        dec!(500.00)
    );

    // The detail view lists both payments.
    let response = app
        .request(Method::GET, &format!("/api/v1/invoices/{}", id), None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["payments"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn overpayment_is_rejected() {
    let app = TestApp::new().await;
    let invoice = seed_invoice(&app).await;
    let id = invoice["id"].as_str().unwrap();

    let (status, _) = pay(&app, id, "600.00").await;
    assert_eq!(status, 400);

    let (status, _) = pay(&app, id, "400.00").await;
    assert_eq!(status, 200);

    // 400 paid, 100 outstanding; 200 more is too much.
    let (status, body) = pay(&app, id, "200.00").await;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("outstanding"));
}

#[tokio::test]
async fn settled_and_void_invoices_refuse_payments() {
    let app = TestApp::new().await;
    let invoice = seed_invoice(&app).await;
    let id = invoice["id"].as_str().unwrap();

    let (status, _) = pay(&app, id, "500.00").await;
    assert_eq!(status, 200);

    let (status, _) = pay(&app, id, "1.00").await;
    assert_eq!(status, 409);

    // A paid invoice cannot be voided either.
    let response = app
        .request(Method::POST, &format!("/api/v1/invoices/{}/void", id), None)
        .await;
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn partially_paid_invoices_cannot_be_voided() {
    let app = TestApp::new().await;
    let invoice = seed_invoice(&app).await;
    let id = invoice["id"].as_str().unwrap();

    let (status, _) = pay(&app, id, "100.00").await;
    assert_eq!(status, 200);

    let response = app
        .request(Method::POST, &format!("/api/v1/invoices/{}/void", id), None)
        .await;
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn non_positive_payments_fail_validation() {
    let app = TestApp::new().await;
    let invoice = seed_invoice(&app).await;
    let id = invoice["id"].as_str().unwrap();

    let (status, _) = pay(&app, id, "0").await;
    assert_eq!(status, 400);

    let (status, _) = pay(&app, id, "-5.00").await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn unknown_invoices_and_orders_return_404() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/invoices/00000000-0000-0000-0000-000000000001",
            None,
        )
        .await;
    assert_eq!(response.status(), 404);

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders/00000000-0000-0000-0000-000000000001/invoice",
            None,
        )
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn listing_filters_by_status() {
    let app = TestApp::new().await;
    let invoice = seed_invoice(&app).await;
    let id = invoice["id"].as_str().unwrap();

    let (status, _) = pay(&app, id, "500.00").await;
    assert_eq!(status, 200);

    let response = app
        .request(Method::GET, "/api/v1/invoices?status=paid", None)
        .await;
    assert_eq!(response_json(response).await["data"]["total"], 1);

    let response = app
        .request(Method::GET, "/api/v1/invoices?status=issued", None)
        .await;
    assert_eq!(response_json(response).await["data"]["total"], 0);
}
