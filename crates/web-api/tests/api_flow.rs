mod support;

use application::testing::{Faults, InMemoryStore};
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use config::Environment;
use serde_json::json;
use tower::ServiceExt;

use support::{build_app, get, post_json, send, today};

#[tokio::test]
async fn client_registration_login_and_payment_flow() {
    let store = InMemoryStore::new();
    let plan = store.seed_plan("Premium", true).await;
    let app = build_app(&store, Environment::Development);

    let (status, body) = send(
        &app,
        post_json(
            "/register-client",
            json!({ "name": "Ana", "dni": "123", "plan_id": plan.0 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "success");
    let client_id = body["clientId"].as_i64().expect("client id");

    let (status, body) = send(&app, post_json("/login", json!({ "dni": "123" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "Ana");
    assert_eq!(body["user"]["plan"]["name"], "Premium");
    assert_eq!(body["user"]["payment_status"], "unpaid");

    let (status, body) = send(
        &app,
        post_json(
            "/register-payment",
            json!({ "user_id": client_id, "amount": 5000, "month": "2024-06" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["payment_date"], "2024-06-10");
    assert_eq!(body["data"]["next_payment_date"], "2024-07-10");

    let (status, body) = send(&app, get("/payment-history")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["user_name"], "Ana");
    assert_eq!(body["data"][0]["month"], "2024-06");

    let (status, body) = send(&app, get("/clients")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["payment_status"], "paid");
    assert_eq!(body["data"][0]["next_payment_date"], "2024-07-10");
}

#[tokio::test]
async fn negative_amount_is_rejected_without_side_effects() {
    let store = InMemoryStore::new();
    let plan = store.seed_plan("Basic", true).await;
    let app = build_app(&store, Environment::Development);

    let (_, body) = send(
        &app,
        post_json(
            "/register-client",
            json!({ "name": "Ana", "dni": "123", "plan_id": plan.0 }),
        ),
    )
    .await;
    let client_id = body["clientId"].as_i64().expect("client id");

    let (status, body) = send(
        &app,
        post_json(
            "/register-payment",
            json!({ "user_id": client_id, "amount": -5, "month": "2024-06" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(store.payments().await.is_empty());
    assert_eq!(store.begun(), 0);
}

#[tokio::test]
async fn duplicate_dni_returns_conflict() {
    let store = InMemoryStore::new();
    let plan = store.seed_plan("Basic", true).await;
    let app = build_app(&store, Environment::Development);
    let payload = json!({ "name": "Ana", "dni": "123", "plan_id": plan.0 });

    let (status, _) = send(&app, post_json("/register-client", payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, post_json("/register-client", payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn plan_without_panel_access_is_forbidden() {
    let store = InMemoryStore::new();
    let plan = store.seed_plan("Gym only", false).await;
    let app = build_app(&store, Environment::Development);

    send(
        &app,
        post_json(
            "/register-client",
            json!({ "name": "Luis", "dni": "456", "plan_id": plan.0 }),
        ),
    )
    .await;

    let (status, body) = send(&app, post_json("/login", json!({ "dni": "456" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["status"], "error");
    assert!(body.get("user").is_none());
}

#[tokio::test]
async fn unknown_dni_and_missing_dni() {
    let store = InMemoryStore::new();
    let app = build_app(&store, Environment::Development);

    let (status, _) = send(&app, post_json("/login", json!({ "dni": "999" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, post_json("/login", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn payment_for_unknown_user_is_not_found() {
    let store = InMemoryStore::new();
    let app = build_app(&store, Environment::Development);

    let (status, _) = send(
        &app,
        post_json(
            "/register-payment",
            json!({ "user_id": 42, "amount": 100, "month": "2024-06" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let store = InMemoryStore::new();
    let app = build_app(&store, Environment::Development);

    let request = Request::builder()
        .method("POST")
        .uri("/register-payment")
        .header("content-type", "application/json")
        .body(Body::from("{\"user_id\": 1, \"amount\":"))
        .expect("request");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_JSON");
}

#[tokio::test]
async fn health_reports_pool_and_environment() {
    let store = InMemoryStore::new();
    let app = build_app(&store, Environment::Development);

    let response = app.clone().oneshot(get("/health")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["referrer-policy"], "no-referrer");

    let (_, body) = send(&app, get("/health")).await;
    assert_eq!(body["database"], "connected");
    assert_eq!(body["environment"], "development");
    assert_eq!(body["pool"]["acquired"], 0);
}

#[tokio::test]
async fn unavailable_database_maps_to_service_unavailable() {
    let store = InMemoryStore::new();
    store.set_faults(Faults {
        unavailable: true,
        ..Faults::default()
    });

    let app = build_app(&store, Environment::Production);
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["database"], "disconnected");

    let (status, body) = send(&app, get("/test")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.get("detail").is_none());

    let dev = build_app(&store, Environment::Development);
    let (_, body) = send(&dev, get("/clients")).await;
    assert!(body["detail"].as_str().expect("detail").contains("connection refused"));
}

#[tokio::test]
async fn self_test_counts_users() {
    let store = InMemoryStore::new();
    store.seed_admin("Root", "1").await;
    let app = build_app(&store, Environment::Development);

    let (status, body) = send(&app, get("/test")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["testResult"], 2);
    assert_eq!(body["totalUsers"], 1);
}

#[tokio::test]
async fn history_limit_is_validated_and_clamped() {
    let store = InMemoryStore::new();
    let app = build_app(&store, Environment::Development);

    let (status, body) = send(&app, get("/payment-history?limit=0")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);

    let (status, body) = send(&app, get("/payment-history?limit=abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn punctuated_dni_registers_logs_in_and_lists() {
    let store = InMemoryStore::new();
    let plan = store.seed_plan("Premium", true).await;
    let app = build_app(&store, Environment::Development);

    for dni in ["12.345.678", "12345678-K"] {
        let (status, _) = send(
            &app,
            post_json(
                "/register-client",
                json!({ "name": "Ana", "dni": dni, "plan_id": plan.0 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(&app, post_json("/login", json!({ "dni": dni }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["dni"], dni);
    }

    let (status, body) = send(&app, get("/clients")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
}
