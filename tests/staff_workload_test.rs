//! The staff workload report: active project counts, average progress,
//! and the derived label.

mod common;

use axum::http::Method;
use common::{response_json, TestApp};
use serde_json::{json, Value};

async fn assign_project(app: &TestApp, staff_id: &str, name: &str, progress: i32) -> Value {
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/staff/{}/projects", staff_id),
            Some(json!({ "name": name, "progress": progress })),
        )
        .await;
    assert_eq!(response.status(), 200, "project assignment should succeed");
    response_json(response).await["data"].clone()
}

async fn workload_row(app: &TestApp, staff_id: &str) -> Value {
    let response = app.request(Method::GET, "/api/v1/staff/workload", None).await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|row| row["staff_id"] == staff_id)
        .cloned()
        .expect("staff member should appear in the report")
}

#[tokio::test]
async fn unassigned_staff_are_labeled_new() {
    let app = TestApp::new().await;
    let member = app.seed_staff("Huda Saleh", "huda@nubras.com").await;

    let row = workload_row(&app, member["id"].as_str().unwrap()).await;
    assert_eq!(row["status"], "new");
    assert_eq!(row["total_projects"], 0);
    assert_eq!(row["active_projects"], 0);
}

#[tokio::test]
async fn many_stalled_projects_read_as_overloaded() {
    let app = TestApp::new().await;
    let member = app.seed_staff("Omar Idris", "omar@nubras.com").await;
    let id = member["id"].as_str().unwrap();

    // Six active projects averaging 30% progress.
    for i in 0..6 {
        assign_project(&app, id, &format!("order backlog {}", i), 30).await;
    }

    let row = workload_row(&app, id).await;
    assert_eq!(row["active_projects"], 6);
    assert_eq!(row["status"], "overloaded");
}

#[tokio::test]
async fn six_projects_moving_along_are_not_overloaded() {
    let app = TestApp::new().await;
    let member = app.seed_staff("Omar Idris", "omar@nubras.com").await;
    let id = member["id"].as_str().unwrap();

    for i in 0..6 {
        assign_project(&app, id, &format!("order {}", i), 60).await;
    }

    let row = workload_row(&app, id).await;
    assert_eq!(row["status"], "normal");
}

#[tokio::test]
async fn high_average_progress_reads_as_excellent() {
    let app = TestApp::new().await;
    let member = app.seed_staff("Layla Nasser", "layla@nubras.com").await;
    let id = member["id"].as_str().unwrap();

    assign_project(&app, id, "wedding order", 85).await;
    assign_project(&app, id, "alterations", 90).await;

    let row = workload_row(&app, id).await;
    assert_eq!(row["active_projects"], 2);
    assert_eq!(row["status"], "excellent");
}

#[tokio::test]
async fn completed_projects_do_not_count_as_active() {
    let app = TestApp::new().await;
    let member = app.seed_staff("Sara Aziz", "sara@nubras.com").await;
    let id = member["id"].as_str().unwrap();

    let project = assign_project(&app, id, "finished order", 100).await;
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/projects/{}", project["id"].as_str().unwrap()),
            Some(json!({ "status": "completed" })),
        )
        .await;
    assert_eq!(response.status(), 200);

    let row = workload_row(&app, id).await;
    assert_eq!(row["total_projects"], 1);
    assert_eq!(row["active_projects"], 0);
    // A history with nothing active is neither new nor excellent.
    assert_eq!(row["status"], "normal");
}

#[tokio::test]
async fn progress_is_clamped_to_percent_range() {
    let app = TestApp::new().await;
    let member = app.seed_staff("Sara Aziz", "sara@nubras.com").await;
    let id = member["id"].as_str().unwrap();

    let project = assign_project(&app, id, "rush order", 50).await;
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/projects/{}", project["id"].as_str().unwrap()),
            Some(json!({ "progress": 100 })),
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response_json(response).await["data"]["progress"], 100);

    // Out-of-range values fail request validation.
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/projects/{}", project["id"].as_str().unwrap()),
            Some(json!({ "progress": 150 })),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn duplicate_staff_emails_conflict() {
    let app = TestApp::new().await;
    app.seed_staff("Huda Saleh", "huda@nubras.com").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/staff",
            Some(json!({ "name": "Other Huda", "email": "huda@nubras.com" })),
        )
        .await;
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn unknown_staff_and_project_lookups_fail() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/staff/00000000-0000-0000-0000-000000000001",
            None,
        )
        .await;
    assert_eq!(response.status(), 404);

    let response = app
        .request(
            Method::POST,
            "/api/v1/staff/00000000-0000-0000-0000-000000000001/projects",
            Some(json!({ "name": "orphan project" })),
        )
        .await;
    assert_eq!(response.status(), 404);

    let response = app
        .request(
            Method::PUT,
            "/api/v1/projects/00000000-0000-0000-0000-000000000001",
            Some(json!({ "progress": 10 })),
        )
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn staff_detail_includes_their_projects() {
    let app = TestApp::new().await;
    let member = app.seed_staff("Layla Nasser", "layla@nubras.com").await;
    let id = member["id"].as_str().unwrap();

    assign_project(&app, id, "wedding order", 10).await;
    assign_project(&app, id, "alterations", 20).await;

    let response = app
        .request(Method::GET, &format!("/api/v1/staff/{}", id), None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["projects"].as_array().unwrap().len(), 2);
}
