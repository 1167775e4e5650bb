use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use application::services::{LoginRequest, RegisterClientRequest, RegisterPaymentRequest};

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
struct LoginPayload {
    dni: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegisterClientPayload {
    name: Option<String>,
    dni: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    plan_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RegisterPaymentPayload {
    user_id: Option<i64>,
    amount: Option<Decimal>,
    month: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<u32>,
}

type ApiResult<T> = Result<T, ApiError>;

pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/test", get(self_test))
        .route("/login", post(login))
        .route("/register-client", post(register_client))
        .route("/clients", get(list_clients))
        .route("/register-payment", post(register_payment))
        .route("/payment-history", get(payment_history))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let report = state.system_service.health().await;
    let (status, database, code) = if report.database_connected {
        ("success", "connected", StatusCode::OK)
    } else {
        ("error", "disconnected", StatusCode::SERVICE_UNAVAILABLE)
    };

    let body = json!({
        "status": status,
        "database": database,
        "environment": state.environment.as_str(),
        "timestamp": report.timestamp,
        "pool": report.pool,
    });
    (code, Json(body))
}

async fn self_test(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let report = state
        .system_service
        .self_test()
        .await
        .map_err(|err| state.reject(err))?;

    Ok(Json(json!({
        "status": "success",
        "testResult": report.test_result,
        "totalUsers": report.total_users,
    })))
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginPayload>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(payload) = payload?;
    let profile = state
        .auth_service
        .login(LoginRequest { dni: payload.dni })
        .await
        .map_err(|err| state.reject(err))?;

    Ok(Json(json!({
        "status": "success",
        "message": "login successful",
        "user": profile,
    })))
}

async fn register_client(
    State(state): State<AppState>,
    payload: Result<Json<RegisterClientPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(payload) = payload?;
    let user = state
        .client_service
        .register_client(RegisterClientRequest {
            name: payload.name,
            dni: payload.dni,
            email: payload.email,
            phone: payload.phone,
            plan_id: payload.plan_id,
        })
        .await
        .map_err(|err| state.reject(err))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "client registered",
            "clientId": user.id,
        })),
    ))
}

async fn list_clients(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let clients = state
        .client_service
        .list_clients()
        .await
        .map_err(|err| state.reject(err))?;

    Ok(Json(json!({
        "status": "success",
        "count": clients.len(),
        "data": clients,
    })))
}

async fn register_payment(
    State(state): State<AppState>,
    payload: Result<Json<RegisterPaymentPayload>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(payload) = payload?;
    let receipt = state
        .payment_service
        .register_payment(RegisterPaymentRequest {
            user_id: payload.user_id,
            amount: payload.amount,
            month: payload.month,
        })
        .await
        .map_err(|err| state.reject(err))?;

    Ok(Json(json!({
        "status": "success",
        "message": "payment registered",
        "data": {
            "payment_id": receipt.payment.id,
            "payment_date": receipt.payment.payment_date,
            "next_payment_date": receipt.next_payment_date,
        },
    })))
}

async fn payment_history(
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query?;
    let entries = state
        .payment_service
        .payment_history(query.limit)
        .await
        .map_err(|err| state.reject(err))?;

    Ok(Json(json!({
        "status": "success",
        "count": entries.len(),
        "data": entries,
    })))
}
