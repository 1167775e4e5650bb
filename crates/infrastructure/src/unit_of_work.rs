use sqlx::{PgConnection, Postgres, Transaction};

use crate::{error::map_sqlx_err, pool::PoolLease};
use domain::RepositoryError;

/// 占用一个专用连接的数据库事务。
///
/// 未调用 [`commit`](Self::commit) 就被丢弃时，sqlx 会回滚事务并把连接还给池，
/// 随后租约记录归还事件。
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
    lease: PoolLease,
}

impl PgUnitOfWork {
    pub(crate) fn new(tx: Transaction<'static, Postgres>, lease: PoolLease) -> Self {
        Self { tx, lease }
    }

    pub fn connection(&mut self) -> &mut PgConnection {
        &mut self.tx
    }

    pub async fn commit(self) -> Result<(), RepositoryError> {
        let Self { tx, lease } = self;
        let result = tx.commit().await.map_err(map_sqlx_err);
        tracing::debug!(lease_id = lease.id(), ok = result.is_ok(), "transaction committed");
        drop(lease);
        result
    }

    pub async fn rollback(self) -> Result<(), RepositoryError> {
        let Self { tx, lease } = self;
        let result = tx.rollback().await.map_err(map_sqlx_err);
        tracing::debug!(lease_id = lease.id(), "transaction rolled back");
        drop(lease);
        result
    }
}
