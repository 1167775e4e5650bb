use std::{sync::Arc, time::Duration};

use domain::{
    billing, BillingMonth, Date, DomainError, NewPayment, Payment, PaymentAmount,
    PaymentHistoryEntry, RepositoryError, UserId,
};
use rust_decimal::Decimal;

use crate::{
    clock::Clock,
    error::ApplicationError,
    repository::{AccountDirectory, LedgerUnitOfWork, PaymentHistory, PaymentLedgerStore},
};

pub const DEFAULT_HISTORY_LIMIT: u32 = 100;
pub const MAX_HISTORY_LIMIT: u32 = 500;

#[derive(Debug, Clone, Default)]
pub struct RegisterPaymentRequest {
    pub user_id: Option<i64>,
    pub amount: Option<Decimal>,
    pub month: Option<String>,
}

/// 缴费成功后的回执
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub next_payment_date: Date,
}

pub struct PaymentServiceDependencies {
    pub directory: Arc<dyn AccountDirectory>,
    pub ledger: Arc<dyn PaymentLedgerStore>,
    pub history: Arc<dyn PaymentHistory>,
    pub clock: Arc<dyn Clock>,
    /// 拿到连接之后，写入到提交的上限；等待连接由连接池的获取超时约束
    pub transaction_timeout: Duration,
}

pub struct PaymentService {
    deps: PaymentServiceDependencies,
}

impl PaymentService {
    pub fn new(deps: PaymentServiceDependencies) -> Self {
        Self { deps }
    }

    /// 记录一笔缴费并推进用户的账单状态。
    ///
    /// 写入缴费记录和更新用户状态在同一个事务中完成：要么都可见，要么都不可见。
    /// 事务使用从连接池取出的专用连接，任何退出路径上都会归还。
    /// 连接池饱和时先排队等待连接，超时只从拿到连接之后开始计算。
    pub async fn register_payment(
        &self,
        request: RegisterPaymentRequest,
    ) -> Result<PaymentReceipt, ApplicationError> {
        let user_id = request
            .user_id
            .map(UserId::from)
            .ok_or_else(|| ApplicationError::validation("user_id", "is required"))?;
        let amount = request
            .amount
            .ok_or_else(|| ApplicationError::validation("amount", "is required"))?;
        let amount = PaymentAmount::new(amount)?;
        let month = request
            .month
            .ok_or_else(|| ApplicationError::validation("month", "is required"))?;
        let month = BillingMonth::parse(month)?;

        if self.deps.directory.find_by_id(user_id).await?.is_none() {
            return Err(DomainError::resource_not_found("user", user_id.to_string()).into());
        }

        let payment_date = self.deps.clock.today();
        let next_payment_date = billing::next_payment_date(payment_date);
        let new_payment = NewPayment {
            user_id,
            amount,
            payment_date,
            month: month.clone(),
        };

        let unit = self.deps.ledger.begin().await?;
        let payment = tokio::time::timeout(
            self.deps.transaction_timeout,
            Self::settle(unit, new_payment, next_payment_date),
        )
        .await
        .map_err(|_| {
            tracing::error!(%user_id, %month, "payment transaction timed out, rolled back");
            ApplicationError::Timeout {
                operation: "payment transaction",
            }
        })?
        .map_err(|err| match err {
            ApplicationError::Repository(RepositoryError::Conflict { .. }) => {
                DomainError::resource_already_exists(
                    "payment",
                    format!("for user {user_id} and month {month}"),
                )
                .into()
            }
            ApplicationError::Repository(RepositoryError::NotFound) => {
                DomainError::resource_not_found("user", user_id.to_string()).into()
            }
            other => other,
        })?;

        tracing::info!(
            %user_id,
            payment_id = %payment.id,
            amount = %payment.amount,
            %month,
            %next_payment_date,
            "payment registered"
        );

        Ok(PaymentReceipt {
            payment,
            next_payment_date,
        })
    }

    /// 执行两步写入，提交或回滚；超时时 future 被丢弃，事务随之回滚
    async fn settle(
        mut unit: Box<dyn LedgerUnitOfWork>,
        payment: NewPayment,
        next_payment_date: Date,
    ) -> Result<Payment, ApplicationError> {
        match Self::apply(&mut *unit, payment, next_payment_date).await {
            Ok(stored) => {
                unit.commit().await?;
                Ok(stored)
            }
            Err(err) => {
                if let Err(rollback_err) = unit.rollback().await {
                    tracing::error!(error = %rollback_err, "rollback failed");
                }
                Err(err.into())
            }
        }
    }

    async fn apply(
        unit: &mut dyn LedgerUnitOfWork,
        payment: NewPayment,
        next_payment_date: Date,
    ) -> Result<Payment, RepositoryError> {
        let user_id = payment.user_id;
        let stored = unit.insert_payment(payment).await?;
        unit.mark_paid(user_id, next_payment_date).await?;
        Ok(stored)
    }

    /// 缴费历史，`limit` 缺省为 100，范围限制在 1..=500
    pub async fn payment_history(
        &self,
        limit: Option<u32>,
    ) -> Result<Vec<PaymentHistoryEntry>, ApplicationError> {
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);
        Ok(self.deps.history.list_history(limit).await?)
    }
}
