//! Shared integration-test harness: an application router backed by an
//! in-memory SQLite database with migrations applied, plus a capturing
//! mailer so magic-link flows can be driven end to end.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, Response},
    middleware, Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use nubras_api::{
    auth::{auth_routes, user, AuthConfig, AuthService},
    config::AppConfig,
    db::{establish_connection_with_config, run_migrations, DbConfig},
    events::{self, EventSender},
    handlers::AppServices,
    notifications::{Mailer, MailerError},
    request_id::request_id_middleware,
    AppState,
};

/// Mailer that records every magic link instead of delivering it.
#[derive(Default)]
pub struct CapturingMailer {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl CapturingMailer {
    pub fn last_link_for(&self, recipient: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == recipient)
            .map(|(_, link)| link.clone())
    }
}

#[async_trait]
impl Mailer for CapturingMailer {
    async fn send_magic_link(&self, recipient: &str, link: &str) -> Result<(), MailerError> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), link.to_string()));
        Ok(())
    }
}

/// Helper harness spinning up application state over in-memory SQLite.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub mailer: Arc<CapturingMailer>,
    token: String,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let cfg = AppConfig::new(
            "sqlite::memory:",
            "test_secret_key_for_testing_purposes_only_32chars",
            3600,
            "127.0.0.1",
            18_080,
            "test",
        );

        // A single pooled connection keeps the in-memory database alive
        // and shared for the harness lifetime.
        let db_cfg = DbConfig {
            url: cfg.database_url.clone(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let db = establish_connection_with_config(&db_cfg)
            .await
            .expect("test database");
        run_migrations(&db).await.expect("migrations");
        let db_arc = Arc::new(db);

        let (event_tx, event_rx) = tokio::sync::mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let mailer = Arc::new(CapturingMailer::default());
        let auth_service = Arc::new(AuthService::new(
            AuthConfig::from_app_config(&cfg),
            db_arc.clone(),
            mailer.clone(),
            Arc::new(event_sender.clone()),
        ));

        let services = AppServices::new(
            db_arc.clone(),
            Arc::new(event_sender.clone()),
            cfg.default_currency.clone(),
        );

        let state = AppState {
            db: db_arc.clone(),
            config: cfg,
            event_sender,
            services,
            auth: auth_service.clone(),
        };

        let router = Router::new()
            .nest("/api/v1", nubras_api::api_v1_routes(auth_service.clone()))
            .nest("/auth", auth_routes().with_state(auth_service.clone()))
            .layer(middleware::from_fn(request_id_middleware))
            .with_state(state.clone());

        // A signed-in operator for authenticated requests.
        let account = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set("operator@nubras.com".to_string()),
            name: Set(Some("Test Operator".to_string())),
            created_at: Set(Utc::now()),
            last_sign_in_at: Set(None),
        }
        .insert(&*db_arc)
        .await
        .expect("seed operator");
        let token = auth_service
            .issue_session(&account)
            .expect("session token")
            .token;

        Self {
            router,
            state,
            mailer,
            token,
            _event_task: event_task,
        }
    }

    pub fn session_token(&self) -> &str {
        &self.token
    }

    /// Sends a request with the operator's bearer token attached.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
        self.dispatch(method, uri, body, Some(format!("Bearer {}", self.token)), None)
            .await
    }

    pub async fn request_unauthenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response<Body> {
        self.dispatch(method, uri, body, None, None).await
    }

    pub async fn request_with_cookie(
        &self,
        method: Method,
        uri: &str,
        cookie: &str,
        body: Option<Value>,
    ) -> Response<Body> {
        self.dispatch(method, uri, body, None, Some(cookie.to_string()))
            .await
    }

    async fn dispatch(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        authorization: Option<String>,
        cookie: Option<String>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(authorization) = authorization {
            builder = builder.header(header::AUTHORIZATION, authorization);
        }
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        self.router.clone().oneshot(request).await.expect("response")
    }

    /// Creates a customer through the API; returns the `data` object.
    pub async fn seed_customer(&self, name: &str, phone: Option<&str>) -> Value {
        let response = self
            .request(
                Method::POST,
                "/api/v1/customers",
                Some(json!({ "name": name, "phone": phone })),
            )
            .await;
        assert_eq!(response.status(), 200, "customer seed should succeed");
        response_json(response).await["data"].clone()
    }

    /// Creates an order through the API; returns the `data` object.
    pub async fn seed_order(&self, customer_id: &str, items: &[(&str, i32, &str)]) -> Value {
        let items: Vec<Value> = items
            .iter()
            .map(|(description, quantity, unit_price)| {
                json!({
                    "description": description,
                    "quantity": quantity,
                    "unit_price": unit_price,
                })
            })
            .collect();
        let response = self
            .request(
                Method::POST,
                "/api/v1/orders",
                Some(json!({ "customer_id": customer_id, "items": items })),
            )
            .await;
        assert_eq!(response.status(), 200, "order seed should succeed");
        response_json(response).await["data"].clone()
    }

    /// Creates a staff member through the API; returns the `data` object.
    pub async fn seed_staff(&self, name: &str, email: &str) -> Value {
        let response = self
            .request(
                Method::POST,
                "/api/v1/staff",
                Some(json!({ "name": name, "email": email })),
            )
            .await;
        assert_eq!(response.status(), 200, "staff seed should succeed");
        response_json(response).await["data"].clone()
    }
}

pub async fn response_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Decimals serialize as strings; numbers can appear after SQLite round
/// trips. Compare numerically.
pub fn decimal_value(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("expected decimal, got {:?}", other),
    }
}
