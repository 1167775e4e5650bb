//! 数据库连通性检查。

use application::{DatabaseProbe, PoolSnapshot};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::RepositoryError;

use crate::{error::map_sqlx_err, pool::ConnectionPool, InfrastructureError};

#[derive(Clone)]
pub struct PgDatabaseProbe {
    pool: ConnectionPool,
}

impl PgDatabaseProbe {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DatabaseProbe for PgDatabaseProbe {
    async fn ping(&self) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("SELECT 1")
            .execute(&mut *conn)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn arithmetic_check(&self) -> Result<i64, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query_scalar::<_, i32>("SELECT 1 + 1")
            .fetch_one(&mut *conn)
            .await
            .map(i64::from)
            .map_err(map_sqlx_err)
    }

    fn pool_snapshot(&self) -> PoolSnapshot {
        self.pool.snapshot()
    }
}

/// 启动时的连接检查结果
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub server_time: DateTime<Utc>,
    pub database: String,
    pub user: String,
    pub schema_ready: bool,
}

/// 取一个连接，查询服务器时间、库名和用户，并确认 `users` 表存在。
///
/// 表缺失只记录警告，连接失败返回带排查提示的错误，由调用方决定是否退出。
pub async fn verify_connection(pool: &ConnectionPool) -> Result<ConnectionInfo, InfrastructureError> {
    let mut conn = pool.acquire_raw().await.map_err(InfrastructureError::connection)?;

    let (server_time, database, user) = sqlx::query_as::<_, (DateTime<Utc>, String, String)>(
        "SELECT now(), current_database()::text, current_user::text",
    )
    .fetch_one(&mut *conn)
    .await
    .map_err(InfrastructureError::connection)?;

    let schema_ready = sqlx::query_scalar::<_, bool>(
        "SELECT to_regclass('public.users') IS NOT NULL",
    )
    .fetch_one(&mut *conn)
    .await
    .map_err(InfrastructureError::connection)?;

    if schema_ready {
        tracing::info!(%database, %user, %server_time, "database connection verified");
    } else {
        tracing::warn!(%database, "database reachable but table `users` is missing");
    }

    Ok(ConnectionInfo {
        server_time,
        database,
        user,
        schema_ready,
    })
}
