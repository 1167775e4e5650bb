use std::sync::Arc;

use domain::{DomainError, Dni, Plan, User};
use serde::Serialize;

use crate::{error::ApplicationError, repository::AccountDirectory};

#[derive(Debug, Clone, Default)]
pub struct LoginRequest {
    pub dni: Option<String>,
}

/// 登录成功后返回的用户资料
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginProfile {
    #[serde(flatten)]
    pub user: User,
    pub plan: Plan,
}

pub struct AuthServiceDependencies {
    pub directory: Arc<dyn AccountDirectory>,
}

pub struct AuthService {
    deps: AuthServiceDependencies,
}

impl AuthService {
    pub fn new(deps: AuthServiceDependencies) -> Self {
        Self { deps }
    }

    /// 按证件号登录客户面板。
    ///
    /// 套餐每次重新读取：注册之后套餐权限可能已经变化。
    pub async fn login(&self, request: LoginRequest) -> Result<LoginProfile, ApplicationError> {
        let dni = request
            .dni
            .ok_or_else(|| ApplicationError::validation("dni", "is required"))?;
        let dni = Dni::parse(dni)?;

        let user = self
            .deps
            .directory
            .find_by_dni(&dni)
            .await?
            .ok_or_else(|| DomainError::resource_not_found("user with dni", dni.as_str()))?;

        let plan = match user.plan_id {
            Some(plan_id) => self.deps.directory.find_plan(plan_id).await?,
            None => None,
        };

        match plan {
            Some(plan) if plan.can_access_client_panel => {
                tracing::info!(user_id = %user.id, plan = %plan.name, "client logged in");
                Ok(LoginProfile { user, plan })
            }
            _ => {
                tracing::warn!(user_id = %user.id, "login refused: plan lacks client panel access");
                Err(DomainError::permission_denied("plan does not allow client panel access").into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ErrorKind,
        repository::MockAccountDirectory,
        services::{ClientService, ClientServiceDependencies, RegisterClientRequest},
        testing::InMemoryStore,
    };
    use domain::{AccountStatus, PaymentStatus, PlanId, Role, UserId};

    async fn setup(can_access: bool) -> (InMemoryStore, AuthService, PlanId) {
        let store = InMemoryStore::new();
        let plan = store.seed_plan("Plan", can_access).await;
        ClientService::new(ClientServiceDependencies {
            directory: Arc::new(store.clone()),
        })
        .register_client(RegisterClientRequest {
            name: Some("Ana".into()),
            dni: Some("123".into()),
            email: None,
            phone: None,
            plan_id: Some(plan.0),
        })
        .await
        .unwrap();
        let auth = AuthService::new(AuthServiceDependencies {
            directory: Arc::new(store.clone()),
        });
        (store, auth, plan)
    }

    fn login(dni: &str) -> LoginRequest {
        LoginRequest {
            dni: Some(dni.into()),
        }
    }

    #[tokio::test]
    async fn test_login_with_panel_plan_succeeds() {
        let (_store, auth, plan) = setup(true).await;
        let profile = auth.login(login("123")).await.unwrap();
        assert_eq!(profile.user.name, "Ana");
        assert_eq!(profile.plan.id, plan);
    }

    #[tokio::test]
    async fn test_login_without_panel_access_is_forbidden() {
        let (_store, auth, _) = setup(false).await;
        let err = auth.login(login("123")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[tokio::test]
    async fn test_unknown_dni_is_not_found() {
        let (_store, auth, _) = setup(true).await;
        let err = auth.login(login("999")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_missing_dni_is_a_validation_error() {
        let (_store, auth, _) = setup(true).await;
        let err = auth.login(LoginRequest::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_account_without_plan_is_forbidden() {
        let (store, auth, _) = setup(true).await;
        store.seed_admin("Root", "777").await;
        let err = auth.login(login("777")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[tokio::test]
    async fn test_plan_changes_take_effect_on_next_login() {
        let (store, auth, plan) = setup(true).await;
        assert!(auth.login(login("123")).await.is_ok());

        store.set_plan_access(plan, false).await;
        let err = auth.login(login("123")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(store.plan_reads(), 2);
    }

    #[tokio::test]
    async fn test_find_by_dni_is_idempotent() {
        let (store, _auth, _) = setup(true).await;
        let dni = Dni::parse("123").unwrap();
        let first = store.find_by_dni(&dni).await.unwrap();
        let second = store.find_by_dni(&dni).await.unwrap();
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_plan_is_fetched_for_every_login() {
        let user = User {
            id: UserId::new(1),
            name: "Ana".into(),
            dni: Dni::parse("123").unwrap(),
            email: None,
            phone: None,
            role: Role::Client,
            plan_id: Some(PlanId::new(7)),
            status: AccountStatus::Active,
            payment_status: PaymentStatus::Unpaid,
            next_payment_date: None,
            created_at: chrono::Utc::now(),
        };

        let mut directory = MockAccountDirectory::new();
        directory
            .expect_find_by_dni()
            .withf(|dni| dni.as_str() == "123")
            .times(3)
            .returning(move |_| Ok(Some(user.clone())));
        directory
            .expect_find_plan()
            .withf(|id| *id == PlanId::new(7))
            .times(3)
            .returning(|id| {
                Ok(Some(Plan {
                    id,
                    name: "Premium".into(),
                    can_access_client_panel: true,
                }))
            });

        let auth = AuthService::new(AuthServiceDependencies {
            directory: Arc::new(directory),
        });
        for _ in 0..3 {
            auth.login(login("123")).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_lookup_failure_propagates() {
        let mut directory = MockAccountDirectory::new();
        directory
            .expect_find_by_dni()
            .returning(|_| Err(domain::RepositoryError::unavailable("connection refused")));

        let auth = AuthService::new(AuthServiceDependencies {
            directory: Arc::new(directory),
        });
        let err = auth.login(login("123")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }
}
