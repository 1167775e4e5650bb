//! 基础设施层实现。
//!
//! 提供有界连接池、支付账本事务、账户目录等 PostgreSQL 适配器，实现应用层定义的接口。

pub mod builder;
pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod probe;
mod records;
pub mod repository;
pub mod unit_of_work;

pub use builder::Infrastructure;
pub use error::{connection_hint, InfrastructureError};
pub use ledger::PgPaymentLedger;
pub use migrations::MIGRATOR;
pub use pool::{ConnectionPool, PoolLease, PoolMonitor, PoolStats, PooledConnection};
pub use probe::{verify_connection, ConnectionInfo, PgDatabaseProbe};
pub use repository::{PgAccountDirectory, PgPaymentHistory};
pub use unit_of_work::PgUnitOfWork;
