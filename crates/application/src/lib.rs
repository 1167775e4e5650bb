//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务，处理输入校验、事务边界、
//! 以及对外部适配器（账户目录、支付账本、健康探测）的抽象。

pub mod clock;
pub mod error;
pub mod repository;
pub mod services;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use clock::{Clock, SystemClock};
pub use error::{ApplicationError, ErrorKind};
pub use repository::{
    AccountDirectory, DatabaseProbe, LedgerUnitOfWork, PaymentHistory, PaymentLedgerStore,
    PoolSnapshot,
};
pub use services::{
    AuthService, AuthServiceDependencies, ClientService, ClientServiceDependencies,
    PaymentService, PaymentServiceDependencies, SystemService, SystemServiceDependencies,
};
