//! 支付账本：缴费记录写入与用户状态更新在同一事务内完成。

use application::{LedgerUnitOfWork, PaymentLedgerStore};
use async_trait::async_trait;
use domain::{Date, NewPayment, Payment, RepositoryError, UserId};

use crate::{
    error::map_sqlx_err,
    pool::ConnectionPool,
    records::PaymentRecord,
    unit_of_work::PgUnitOfWork,
};

#[derive(Clone)]
pub struct PgPaymentLedger {
    pool: ConnectionPool,
}

impl PgPaymentLedger {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentLedgerStore for PgPaymentLedger {
    async fn begin(&self) -> Result<Box<dyn LedgerUnitOfWork>, RepositoryError> {
        let unit = self.pool.begin().await?;
        Ok(Box::new(unit))
    }
}

#[async_trait]
impl LedgerUnitOfWork for PgUnitOfWork {
    async fn insert_payment(&mut self, payment: NewPayment) -> Result<Payment, RepositoryError> {
        let record = sqlx::query_as::<_, PaymentRecord>(
            r#"INSERT INTO payments (user_id, amount, payment_date, month)
               VALUES ($1, $2, $3, $4)
               RETURNING id, user_id, amount, payment_date, month, created_at"#,
        )
        .bind(i64::from(payment.user_id))
        .bind(payment.amount.value())
        .bind(payment.payment_date)
        .bind(payment.month.as_str())
        .fetch_one(self.connection())
        .await
        .map_err(map_sqlx_err)?;

        Payment::try_from(record)
    }

    async fn mark_paid(
        &mut self,
        user_id: UserId,
        next_payment_date: Date,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"UPDATE users
               SET payment_status = 'paid', next_payment_date = $2
               WHERE id = $1"#,
        )
        .bind(i64::from(user_id))
        .bind(next_payment_date)
        .execute(self.connection())
        .await
        .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        PgUnitOfWork::commit(*self).await
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError> {
        PgUnitOfWork::rollback(*self).await
    }
}
