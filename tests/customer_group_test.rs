//! Household grouping: customers sharing a phone number attach to one
//! customer group instead of opening duplicates.

mod common;

use axum::http::Method;
use common::{response_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn first_customer_with_a_phone_opens_a_group() {
    let app = TestApp::new().await;

    let customer = app.seed_customer("Amal Rahman", Some("050-123 4567")).await;
    assert!(customer["group_id"].as_str().is_some());
    assert_eq!(customer["phone"], "0501234567");

    let response = app
        .request(Method::GET, "/api/v1/customer-groups", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["phone"], "0501234567");
    assert_eq!(body["data"]["items"][0]["name"], "Amal Rahman");
}

#[tokio::test]
async fn matching_phone_attaches_instead_of_duplicating() {
    let app = TestApp::new().await;

    let first = app.seed_customer("Amal Rahman", Some("0501234567")).await;
    // Different separators, same number.
    let second = app.seed_customer("Yusuf Rahman", Some("050 123 4567")).await;

    assert_eq!(first["group_id"], second["group_id"]);

    let response = app
        .request(Method::GET, "/api/v1/customer-groups", None)
        .await;
    assert_eq!(response_json(response).await["data"]["total"], 1);

    // The group detail lists both household members.
    let group_id = first["group_id"].as_str().unwrap();
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/customer-groups/{}", group_id),
            None,
        )
        .await;
    let body = response_json(response).await;
    let members = body["data"]["members"].as_array().unwrap();
    assert_eq!(members.len(), 2);
}

#[tokio::test]
async fn customers_without_phones_stay_ungrouped() {
    let app = TestApp::new().await;

    let customer = app.seed_customer("Walk-in", None).await;
    assert!(customer["group_id"].is_null());

    let response = app
        .request(Method::GET, "/api/v1/customer-groups", None)
        .await;
    assert_eq!(response_json(response).await["data"]["total"], 0);
}

#[tokio::test]
async fn phone_update_moves_the_customer_into_the_owning_group() {
    let app = TestApp::new().await;

    let anchor = app.seed_customer("Amal Rahman", Some("0501234567")).await;
    let mover = app.seed_customer("Noor Hassan", Some("0559876543")).await;
    assert_ne!(anchor["group_id"], mover["group_id"]);

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/customers/{}", mover["id"].as_str().unwrap()),
            Some(json!({ "phone": "050-123-4567" })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let updated = response_json(response).await;
    assert_eq!(updated["data"]["group_id"], anchor["group_id"]);
}

#[tokio::test]
async fn explicit_group_creation_conflicts_on_owned_phones() {
    let app = TestApp::new().await;

    app.seed_customer("Amal Rahman", Some("0501234567")).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/customer-groups",
            Some(json!({ "name": "Rahman household", "phone": "0501234567" })),
        )
        .await;
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn unknown_customer_lookups_return_404() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/customers/00000000-0000-0000-0000-000000000001",
            None,
        )
        .await;
    assert_eq!(response.status(), 404);

    let response = app
        .request(
            Method::GET,
            "/api/v1/customers/00000000-0000-0000-0000-000000000001/orders",
            None,
        )
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn search_filters_the_customer_list() {
    let app = TestApp::new().await;

    app.seed_customer("Amal Rahman", Some("0501111111")).await;
    app.seed_customer("Noor Hassan", Some("0502222222")).await;

    let response = app
        .request(Method::GET, "/api/v1/customers?search=Rahman", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["name"], "Amal Rahman");
}

#[tokio::test]
async fn deleted_customers_disappear() {
    let app = TestApp::new().await;

    let customer = app.seed_customer("Short Stay", None).await;
    let id = customer["id"].as_str().unwrap();

    let response = app
        .request(Method::DELETE, &format!("/api/v1/customers/{}", id), None)
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .request(Method::GET, &format!("/api/v1/customers/{}", id), None)
        .await;
    assert_eq!(response.status(), 404);
}
