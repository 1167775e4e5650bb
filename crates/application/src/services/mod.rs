mod auth_service;
mod client_service;
mod payment_service;
mod system_service;

pub use auth_service::{AuthService, AuthServiceDependencies, LoginProfile, LoginRequest};
pub use client_service::{ClientService, ClientServiceDependencies, RegisterClientRequest};
pub use payment_service::{
    PaymentReceipt, PaymentService, PaymentServiceDependencies, RegisterPaymentRequest,
    DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT,
};
pub use system_service::{HealthReport, SelfTestReport, SystemService, SystemServiceDependencies};
