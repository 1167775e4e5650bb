use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{Date, Dni, Email, PersonName, PlanId, Timestamp, UserId};

macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok($name::$variant),)+
                    other => Err(DomainError::validation_error(
                        stringify!($name),
                        format!("unknown value {other:?}"),
                    )),
                }
            }
        }
    };
}

text_enum!(
    /// 账户角色
    Role { Client => "client", Admin => "admin" }
);

text_enum!(
    /// 账户状态
    AccountStatus { Active => "active", Inactive => "inactive", Suspended => "suspended" }
);

text_enum!(
    /// 缴费状态，只由支付账本修改
    PaymentStatus { Paid => "paid", Unpaid => "unpaid", Overdue => "overdue" }
);

/// 用户账户
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub dni: Dni,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub plan_id: Option<PlanId>,
    pub status: AccountStatus,
    pub payment_status: PaymentStatus,
    pub next_payment_date: Option<Date>,
    pub created_at: Timestamp,
}

impl User {
    pub fn is_client(&self) -> bool {
        self.role == Role::Client
    }
}

/// 新客户注册数据。客户必须关联一个套餐。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClient {
    pub name: PersonName,
    pub dni: Dni,
    pub email: Option<Email>,
    pub phone: Option<String>,
    pub plan_id: PlanId,
}

impl NewClient {
    pub const ROLE: Role = Role::Client;
    pub const STATUS: AccountStatus = AccountStatus::Active;
    pub const PAYMENT_STATUS: PaymentStatus = PaymentStatus::Unpaid;
}
