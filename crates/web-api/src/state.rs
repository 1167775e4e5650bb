use std::sync::Arc;

use application::{ApplicationError, AuthService, ClientService, PaymentService, SystemService};
use config::Environment;

use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub client_service: Arc<ClientService>,
    pub payment_service: Arc<PaymentService>,
    pub system_service: Arc<SystemService>,
    pub environment: Environment,
}

impl AppState {
    pub fn new(
        auth_service: Arc<AuthService>,
        client_service: Arc<ClientService>,
        payment_service: Arc<PaymentService>,
        system_service: Arc<SystemService>,
        environment: Environment,
    ) -> Self {
        Self {
            auth_service,
            client_service,
            payment_service,
            system_service,
            environment,
        }
    }

    /// 按当前环境把应用层错误转换为响应
    pub fn reject(&self, error: ApplicationError) -> ApiError {
        ApiError::from_application(error, self.environment)
    }
}
