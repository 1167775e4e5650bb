//! 续费规则
//!
//! 续费窗口固定为 30 天，不随套餐变化。

use chrono::Days;

use crate::value_objects::Date;

/// 成功缴费后下一次缴费日距缴费日的天数
pub const RENEWAL_WINDOW_DAYS: u64 = 30;

/// 根据缴费日期计算下一次缴费日
pub fn next_payment_date(payment_date: Date) -> Date {
    payment_date
        .checked_add_days(Days::new(RENEWAL_WINDOW_DAYS))
        .unwrap_or(Date::MAX)
}
