//! 数据库行到领域实体的转换。

use chrono::{DateTime, NaiveDate, Utc};
use domain::{
    BillingMonth, Dni, Payment, PaymentAmount, PaymentHistoryEntry, PaymentId, Plan, PlanId,
    RepositoryError, User, UserId,
};
use rust_decimal::Decimal;
use sqlx::FromRow;

use crate::error::invalid_data;

pub(crate) const USER_COLUMNS: &str = "id, name, dni, email, phone, role, plan_id, status, \
     payment_status, next_payment_date, created_at";

#[derive(Debug, FromRow)]
pub(crate) struct UserRecord {
    id: i64,
    name: String,
    dni: String,
    email: Option<String>,
    phone: Option<String>,
    role: String,
    plan_id: Option<i64>,
    status: String,
    payment_status: String,
    next_payment_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRecord> for User {
    type Error = RepositoryError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        let dni = Dni::from_stored(value.dni);
        let role = value
            .role
            .parse()
            .map_err(|err: domain::DomainError| invalid_data(err.to_string()))?;
        let status = value
            .status
            .parse()
            .map_err(|err: domain::DomainError| invalid_data(err.to_string()))?;
        let payment_status = value
            .payment_status
            .parse()
            .map_err(|err: domain::DomainError| invalid_data(err.to_string()))?;

        Ok(User {
            id: UserId::from(value.id),
            name: value.name,
            dni,
            email: value.email,
            phone: value.phone,
            role,
            plan_id: value.plan_id.map(PlanId::from),
            status,
            payment_status,
            next_payment_date: value.next_payment_date,
            created_at: value.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PlanRecord {
    id: i64,
    name: String,
    can_access_client_panel: bool,
}

impl From<PlanRecord> for Plan {
    fn from(value: PlanRecord) -> Self {
        Plan {
            id: PlanId::from(value.id),
            name: value.name,
            can_access_client_panel: value.can_access_client_panel,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PaymentRecord {
    id: i64,
    user_id: i64,
    amount: Decimal,
    payment_date: NaiveDate,
    month: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRecord> for Payment {
    type Error = RepositoryError;

    fn try_from(value: PaymentRecord) -> Result<Self, Self::Error> {
        let amount =
            PaymentAmount::new(value.amount).map_err(|err| invalid_data(err.to_string()))?;
        let month = BillingMonth::parse(value.month).map_err(|err| invalid_data(err.to_string()))?;

        Ok(Payment {
            id: PaymentId::from(value.id),
            user_id: UserId::from(value.user_id),
            amount,
            payment_date: value.payment_date,
            month,
            created_at: value.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct HistoryRecord {
    #[sqlx(flatten)]
    payment: PaymentRecord,
    user_name: String,
}

impl TryFrom<HistoryRecord> for PaymentHistoryEntry {
    type Error = RepositoryError;

    fn try_from(value: HistoryRecord) -> Result<Self, Self::Error> {
        Ok(PaymentHistoryEntry {
            payment: Payment::try_from(value.payment)?,
            user_name: value.user_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{PaymentStatus, Role};

    fn row(dni: &str) -> UserRecord {
        UserRecord {
            id: 7,
            name: "Ana".into(),
            dni: dni.into(),
            email: None,
            phone: None,
            role: "client".into(),
            plan_id: Some(1),
            status: "active".into(),
            payment_status: "unpaid".into(),
            next_payment_date: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn stored_dni_is_taken_as_is() {
        for dni in ["12.345.678", "12345678-K", "legacy/ID#7"] {
            let user = User::try_from(row(dni)).unwrap();
            assert_eq!(user.dni.as_str(), dni);
            assert_eq!(user.role, Role::Client);
            assert_eq!(user.payment_status, PaymentStatus::Unpaid);
        }
    }

    #[test]
    fn unknown_enum_text_is_invalid_data() {
        let mut record = row("123");
        record.payment_status = "pending".into();
        assert!(User::try_from(record).is_err());
    }
}
