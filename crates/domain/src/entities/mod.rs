//! 领域实体定义
//!
//! 包含系统的核心实体：用户、套餐、缴费记录。

pub mod payment;
pub mod plan;
pub mod user;

pub use payment::{NewPayment, Payment, PaymentHistoryEntry};
pub use plan::Plan;
pub use user::{AccountStatus, NewClient, PaymentStatus, Role, User};
