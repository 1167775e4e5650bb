use std::{sync::Arc, time::Duration};

use application::{
    testing::{FixedClock, InMemoryStore},
    AuthService, AuthServiceDependencies, ClientService, ClientServiceDependencies,
    PaymentService, PaymentServiceDependencies, SystemService, SystemServiceDependencies,
};
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use config::Environment;
use serde_json::Value;
use tower::ServiceExt;
use web_api::{router, AppState};

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 10).expect("date")
}

/// 基于内存存储构建完整路由
pub fn build_app(store: &InMemoryStore, environment: Environment) -> Router {
    let store = Arc::new(store.clone());
    let clock = Arc::new(FixedClock::on(today()));

    let auth_service = Arc::new(AuthService::new(AuthServiceDependencies {
        directory: store.clone(),
    }));
    let client_service = Arc::new(ClientService::new(ClientServiceDependencies {
        directory: store.clone(),
    }));
    let payment_service = Arc::new(PaymentService::new(PaymentServiceDependencies {
        directory: store.clone(),
        ledger: store.clone(),
        history: store.clone(),
        clock: clock.clone(),
        transaction_timeout: Duration::from_secs(10),
    }));
    let system_service = Arc::new(SystemService::new(SystemServiceDependencies {
        directory: store.clone(),
        probe: store,
        clock,
    }));

    let state = AppState::new(
        auth_service,
        client_service,
        payment_service,
        system_service,
        environment,
    );
    router(state, &["*".to_string()])
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, body)
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}
