use domain::RepositoryError;
use thiserror::Error;

/// 启动阶段的基础设施错误
#[derive(Debug, Error)]
pub enum InfrastructureError {
    #[error("database connection failed: {message} (hint: {hint})")]
    Connection { message: String, hint: &'static str },
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl InfrastructureError {
    pub(crate) fn connection(err: sqlx::Error) -> Self {
        Self::Connection {
            hint: connection_hint(&err),
            message: err.to_string(),
        }
    }
}

/// 按错误类别给出排查提示
pub fn connection_hint(err: &sqlx::Error) -> &'static str {
    match err {
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            Some("28P01") | Some("28000") => "check DB_USER and DB_PASSWORD",
            Some("3D000") => "database does not exist, check DB_NAME",
            _ => "see the database server log",
        },
        sqlx::Error::Io(_) => "is the server running and reachable at DB_HOST:DB_PORT?",
        sqlx::Error::Tls(_) => "check DB_SSL_MODE and DB_SSL_ROOT_CERT",
        sqlx::Error::PoolTimedOut => "no connection became available before the acquire timeout",
        sqlx::Error::PoolClosed => "the pool has already been closed",
        sqlx::Error::Configuration(_) => "check the database settings",
        _ => "unexpected database error",
    }
}

pub(crate) fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => RepositoryError::unavailable(err.to_string()),
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            RepositoryError::conflict(db_err.constraint().unwrap_or("unique"))
        }
        // 引用的行已被删除
        sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
            RepositoryError::NotFound
        }
        other => RepositoryError::storage(other.to_string()),
    }
}

pub(crate) fn invalid_data(message: impl Into<String>) -> RepositoryError {
    RepositoryError::storage(message)
}
