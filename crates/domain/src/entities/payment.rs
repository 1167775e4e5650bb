use serde::{Deserialize, Serialize};

use crate::value_objects::{BillingMonth, Date, PaymentAmount, PaymentId, Timestamp, UserId};

/// 缴费记录，写入后不可变。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub user_id: UserId,
    pub amount: PaymentAmount,
    /// 服务端在写入时确定的日期
    pub payment_date: Date,
    pub month: BillingMonth,
    pub created_at: Timestamp,
}

/// 待写入的缴费记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub user_id: UserId,
    pub amount: PaymentAmount,
    pub payment_date: Date,
    pub month: BillingMonth,
}

/// 缴费历史条目（缴费记录 + 用户姓名）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentHistoryEntry {
    #[serde(flatten)]
    pub payment: Payment,
    pub user_name: String,
}
