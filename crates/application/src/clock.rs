use domain::{Date, Timestamp};

pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;

    /// 服务器本地日期，缴费日期以此为准
    fn today(&self) -> Date;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now()
    }

    fn today(&self) -> Date {
        chrono::Local::now().date_naive()
    }
}
