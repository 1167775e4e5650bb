//! 会员管理系统核心领域模型
//!
//! 包含用户、套餐、缴费记录等核心实体，以及续费规则和错误类型。

pub mod billing;
pub mod entities;
pub mod errors;
pub mod value_objects;

// 重新导出常用类型
pub use billing::*;
pub use entities::*;
pub use errors::*;
pub use value_objects::*;
