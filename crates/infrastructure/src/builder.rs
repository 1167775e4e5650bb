use std::sync::Arc;

use application::{AccountDirectory, DatabaseProbe, PaymentHistory, PaymentLedgerStore};
use config::AppConfig;

use crate::{
    ledger::PgPaymentLedger,
    migrations::MIGRATOR,
    pool::ConnectionPool,
    probe::PgDatabaseProbe,
    repository::{PgAccountDirectory, PgPaymentHistory},
    InfrastructureError,
};

/// 共享同一个连接池的全部 PostgreSQL 适配器
#[derive(Clone)]
pub struct Infrastructure {
    pub pool: ConnectionPool,
    pub directory: Arc<PgAccountDirectory>,
    pub ledger: Arc<PgPaymentLedger>,
    pub history: Arc<PgPaymentHistory>,
    pub probe: Arc<PgDatabaseProbe>,
}

impl Infrastructure {
    /// 创建连接池并构造适配器；不会立即建立连接
    pub fn connect(config: &AppConfig) -> Self {
        Self::from_pool(ConnectionPool::connect(&config.database, config.environment))
    }

    pub fn from_pool(pool: ConnectionPool) -> Self {
        Self {
            directory: Arc::new(PgAccountDirectory::new(pool.clone())),
            ledger: Arc::new(PgPaymentLedger::new(pool.clone())),
            history: Arc::new(PgPaymentHistory::new(pool.clone())),
            probe: Arc::new(PgDatabaseProbe::new(pool.clone())),
            pool,
        }
    }

    pub async fn run_migrations(&self) -> Result<(), InfrastructureError> {
        MIGRATOR.run(self.pool.pg_pool()).await?;
        tracing::info!("database migrations applied");
        Ok(())
    }

    pub fn directory_trait(&self) -> Arc<dyn AccountDirectory> {
        self.directory.clone()
    }

    pub fn ledger_trait(&self) -> Arc<dyn PaymentLedgerStore> {
        self.ledger.clone()
    }

    pub fn history_trait(&self) -> Arc<dyn PaymentHistory> {
        self.history.clone()
    }

    pub fn probe_trait(&self) -> Arc<dyn DatabaseProbe> {
        self.probe.clone()
    }
}
