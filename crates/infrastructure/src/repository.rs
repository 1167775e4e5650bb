use application::{AccountDirectory, PaymentHistory};
use async_trait::async_trait;
use domain::{
    Dni, NewClient, PaymentHistoryEntry, Plan, PlanId, RepositoryError, User, UserId,
};

use crate::{
    error::map_sqlx_err,
    pool::ConnectionPool,
    records::{HistoryRecord, PlanRecord, UserRecord, USER_COLUMNS},
};

#[derive(Clone)]
pub struct PgAccountDirectory {
    pool: ConnectionPool,
}

impl PgAccountDirectory {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountDirectory for PgAccountDirectory {
    async fn find_by_dni(&self, dni: &Dni) -> Result<Option<User>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE dni = $1");
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(dni.as_str())
            .fetch_optional(&mut *conn)
            .await
            .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(i64::from(id))
            .fetch_optional(&mut *conn)
            .await
            .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn find_plan(&self, id: PlanId) -> Result<Option<Plan>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let record = sqlx::query_as::<_, PlanRecord>(
            "SELECT id, name, can_access_client_panel FROM plans WHERE id = $1",
        )
        .bind(i64::from(id))
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(Plan::from))
    }

    async fn create_client(&self, client: NewClient) -> Result<User, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!(
            "INSERT INTO users (name, dni, email, phone, role, plan_id, status, payment_status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {USER_COLUMNS}"
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(client.name.as_str())
            .bind(client.dni.as_str())
            .bind(client.email.as_ref().map(|email| email.as_str()))
            .bind(client.phone.as_deref())
            .bind(NewClient::ROLE.as_str())
            .bind(i64::from(client.plan_id))
            .bind(NewClient::STATUS.as_str())
            .bind(NewClient::PAYMENT_STATUS.as_str())
            .fetch_one(&mut *conn)
            .await
            .map_err(map_sqlx_err)?;

        User::try_from(record)
    }

    async fn list_clients(&self) -> Result<Vec<User>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE role = 'client' ORDER BY name, id");
        let records = sqlx::query_as::<_, UserRecord>(&sql)
            .fetch_all(&mut *conn)
            .await
            .map_err(map_sqlx_err)?;

        records.into_iter().map(User::try_from).collect()
    }

    async fn count_users(&self) -> Result<i64, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *conn)
            .await
            .map_err(map_sqlx_err)
    }
}

#[derive(Clone)]
pub struct PgPaymentHistory {
    pool: ConnectionPool,
}

impl PgPaymentHistory {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentHistory for PgPaymentHistory {
    async fn list_history(&self, limit: u32) -> Result<Vec<PaymentHistoryEntry>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let records = sqlx::query_as::<_, HistoryRecord>(
            r#"SELECT p.id, p.user_id, p.amount, p.payment_date, p.month, p.created_at,
                      u.name AS user_name
               FROM payments p
               JOIN users u ON u.id = p.user_id
               ORDER BY p.payment_date DESC, p.id DESC
               LIMIT $1"#,
        )
        .bind(i64::from(limit))
        .fetch_all(&mut *conn)
        .await
        .map_err(map_sqlx_err)?;

        records
            .into_iter()
            .map(PaymentHistoryEntry::try_from)
            .collect()
    }
}
