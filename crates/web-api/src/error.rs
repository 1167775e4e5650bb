use application::{ApplicationError, ErrorKind};
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use config::Environment;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                status: "error",
                code,
                message: message.into(),
                detail: None,
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    fn with_detail(mut self, detail: String) -> Self {
        self.body.detail = Some(detail);
        self
    }

    /// 把应用层错误映射为 HTTP 响应。
    ///
    /// 调用方可修正的错误直接返回错误信息；后端故障只返回笼统信息，
    /// 原始错误仅在开发环境放进 `detail`。
    pub fn from_application(error: ApplicationError, environment: Environment) -> Self {
        let kind = error.kind();
        let (status, code) = match kind {
            ErrorKind::Validation => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ErrorKind::Conflict => (StatusCode::CONFLICT, "CONFLICT"),
            ErrorKind::Authorization => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ErrorKind::Database => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            ErrorKind::Connection => (StatusCode::SERVICE_UNAVAILABLE, "DATABASE_UNAVAILABLE"),
        };

        if error.is_client_error() {
            return Self::new(status, code, error.to_string());
        }

        tracing::error!(error = %error, ?kind, "request failed");
        let message = match kind {
            ErrorKind::Connection => "database is unavailable",
            _ => "internal database error",
        };
        let api_error = Self::new(status, code, message);
        if environment.is_production() {
            api_error
        } else {
            api_error.with_detail(error.to_string())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_JSON", rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
