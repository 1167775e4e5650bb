use std::sync::Arc;

use domain::Timestamp;
use serde::Serialize;

use crate::{
    clock::Clock,
    error::ApplicationError,
    repository::{AccountDirectory, DatabaseProbe, PoolSnapshot},
};

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub database_connected: bool,
    pub timestamp: Timestamp,
    pub pool: PoolSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelfTestReport {
    pub test_result: i64,
    pub total_users: i64,
}

pub struct SystemServiceDependencies {
    pub directory: Arc<dyn AccountDirectory>,
    pub probe: Arc<dyn DatabaseProbe>,
    pub clock: Arc<dyn Clock>,
}

pub struct SystemService {
    deps: SystemServiceDependencies,
}

impl SystemService {
    pub fn new(deps: SystemServiceDependencies) -> Self {
        Self { deps }
    }

    /// 健康检查从不失败，数据库不可达时报告为断开
    pub async fn health(&self) -> HealthReport {
        let database_connected = match self.deps.probe.ping().await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "database health check failed");
                false
            }
        };

        HealthReport {
            database_connected,
            timestamp: self.deps.clock.now(),
            pool: self.deps.probe.pool_snapshot(),
        }
    }

    /// 执行一次简单查询并统计用户数
    pub async fn self_test(&self) -> Result<SelfTestReport, ApplicationError> {
        let test_result = self.deps.probe.arithmetic_check().await?;
        let total_users = self.deps.directory.count_users().await?;
        Ok(SelfTestReport {
            test_result,
            total_users,
        })
    }
}
