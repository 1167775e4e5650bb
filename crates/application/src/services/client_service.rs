use std::sync::Arc;

use domain::{DomainError, Dni, Email, NewClient, PersonName, PlanId, RepositoryError, User};

use crate::{error::ApplicationError, repository::AccountDirectory};

#[derive(Debug, Clone, Default)]
pub struct RegisterClientRequest {
    pub name: Option<String>,
    pub dni: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub plan_id: Option<i64>,
}

pub struct ClientServiceDependencies {
    pub directory: Arc<dyn AccountDirectory>,
}

pub struct ClientService {
    deps: ClientServiceDependencies,
}

impl ClientService {
    pub fn new(deps: ClientServiceDependencies) -> Self {
        Self { deps }
    }

    /// 注册新客户。证件号唯一，套餐必须存在。
    pub async fn register_client(
        &self,
        request: RegisterClientRequest,
    ) -> Result<User, ApplicationError> {
        let name = request
            .name
            .ok_or_else(|| ApplicationError::validation("name", "is required"))?;
        let name = PersonName::parse(name)?;
        let dni = request
            .dni
            .ok_or_else(|| ApplicationError::validation("dni", "is required"))?;
        let dni = Dni::parse(dni)?;
        let plan_id = request
            .plan_id
            .map(PlanId::from)
            .ok_or_else(|| ApplicationError::validation("plan_id", "is required"))?;
        let email = match request.email.filter(|e| !e.trim().is_empty()) {
            Some(email) => Some(Email::parse(email)?),
            None => None,
        };
        let phone = request
            .phone
            .map(|p| p.trim().to_owned())
            .filter(|p| !p.is_empty());

        if self.deps.directory.find_plan(plan_id).await?.is_none() {
            return Err(ApplicationError::validation(
                "plan_id",
                "does not reference an existing plan",
            ));
        }

        if self.deps.directory.find_by_dni(&dni).await?.is_some() {
            return Err(DomainError::resource_already_exists("client with dni", dni.as_str()).into());
        }

        let client = NewClient {
            name,
            dni: dni.clone(),
            email,
            phone,
            plan_id,
        };

        // 并发注册由唯一索引兜底
        let user = self
            .deps
            .directory
            .create_client(client)
            .await
            .map_err(|err| match err {
                RepositoryError::Conflict { .. } => {
                    DomainError::resource_already_exists("client with dni", dni.as_str()).into()
                }
                // 套餐在校验之后被删除
                RepositoryError::NotFound => {
                    ApplicationError::validation("plan_id", "does not reference an existing plan")
                }
                other => ApplicationError::from(other),
            })?;

        tracing::info!(user_id = %user.id, %plan_id, "client registered");
        Ok(user)
    }

    /// 所有客户，按姓名排序
    pub async fn list_clients(&self) -> Result<Vec<User>, ApplicationError> {
        Ok(self.deps.directory.list_clients().await?)
    }
}
