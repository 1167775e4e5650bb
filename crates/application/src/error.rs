use domain::{DomainError, RepositoryError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("repository error: {0}")]
    Repository(RepositoryError),
    #[error("{operation} timed out")]
    Timeout { operation: &'static str },
}

/// 面向调用方的错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 输入缺失或格式错误，调用方可修正
    Validation,
    NotFound,
    Conflict,
    /// 套餐不具备所需权限
    Authorization,
    /// 事务或存储故障
    Database,
    /// 无法从连接池获得连接
    Connection,
}

impl ApplicationError {
    pub fn validation(field: &str, message: &str) -> Self {
        DomainError::validation_error(field, message).into()
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApplicationError::Domain(DomainError::ValidationError { .. }) => ErrorKind::Validation,
            ApplicationError::Domain(DomainError::ResourceNotFound { .. }) => ErrorKind::NotFound,
            ApplicationError::Domain(DomainError::ResourceAlreadyExists { .. }) => {
                ErrorKind::Conflict
            }
            ApplicationError::Domain(DomainError::PermissionDenied { .. }) => {
                ErrorKind::Authorization
            }
            ApplicationError::Repository(RepositoryError::NotFound) => ErrorKind::NotFound,
            ApplicationError::Repository(RepositoryError::Conflict { .. }) => ErrorKind::Conflict,
            ApplicationError::Repository(RepositoryError::Unavailable { .. }) => {
                ErrorKind::Connection
            }
            ApplicationError::Repository(RepositoryError::Storage { .. }) => ErrorKind::Database,
            ApplicationError::Timeout { .. } => ErrorKind::Database,
        }
    }

    /// 调用方可修正的错误；其余为后端故障
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Validation
                | ErrorKind::NotFound
                | ErrorKind::Conflict
                | ErrorKind::Authorization
        )
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        ApplicationError::Repository(value)
    }
}
