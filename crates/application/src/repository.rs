//! 应用层端口。
//!
//! 基础设施层（PostgreSQL）和测试用的内存实现都实现这些接口。

use async_trait::async_trait;
use domain::{
    Date, Dni, NewClient, NewPayment, Payment, PaymentHistoryEntry, Plan, PlanId,
    RepositoryError, User, UserId,
};
use serde::Serialize;

/// 账户目录：用户与套餐的读写
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// 按证件号精确查找，不存在返回 `None`
    async fn find_by_dni(&self, dni: &Dni) -> Result<Option<User>, RepositoryError>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    /// 每次都从存储读取，不做缓存
    async fn find_plan(&self, id: PlanId) -> Result<Option<Plan>, RepositoryError>;
    /// 证件号重复时返回 `RepositoryError::Conflict`
    async fn create_client(&self, client: NewClient) -> Result<User, RepositoryError>;
    async fn list_clients(&self) -> Result<Vec<User>, RepositoryError>;
    async fn count_users(&self) -> Result<i64, RepositoryError>;
}

/// 独占一个连接的支付事务。
///
/// `commit` / `rollback` 消耗自身；未提交就被丢弃时实现必须回滚并归还连接。
#[async_trait]
pub trait LedgerUnitOfWork: Send {
    async fn insert_payment(&mut self, payment: NewPayment) -> Result<Payment, RepositoryError>;

    /// 将用户标记为已缴费并设置下次缴费日；用户不存在返回 `RepositoryError::NotFound`
    async fn mark_paid(
        &mut self,
        user_id: UserId,
        next_payment_date: Date,
    ) -> Result<(), RepositoryError>;

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;
    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError>;
}

/// 支付账本存储：从连接池取出专用连接并开启事务
#[async_trait]
pub trait PaymentLedgerStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn LedgerUnitOfWork>, RepositoryError>;
}

#[async_trait]
pub trait PaymentHistory: Send + Sync {
    /// 按缴费日期倒序
    async fn list_history(&self, limit: u32) -> Result<Vec<PaymentHistoryEntry>, RepositoryError>;
}

/// 连接池压力快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolSnapshot {
    pub size: u32,
    pub idle: u32,
    pub in_use: u64,
    pub acquired: u64,
    pub released: u64,
    pub enqueued: u64,
}

/// 数据库健康探测
#[async_trait]
pub trait DatabaseProbe: Send + Sync {
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// 执行 `SELECT 1 + 1`
    async fn arithmetic_check(&self) -> Result<i64, RepositoryError>;

    fn pool_snapshot(&self) -> PoolSnapshot;
}
