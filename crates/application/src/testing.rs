//! 内存适配器，用于服务层和 HTTP 层测试。
//!
//! `InMemoryStore` 同时实现全部端口。支付事务先暂存写入，提交时一次性应用；
//! 未提交就丢弃的事务不会留下任何数据。可以注入故障来验证回滚路径。

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use domain::{
    AccountStatus, Date, Dni, NewClient, NewPayment, Payment, PaymentHistoryEntry, PaymentId,
    PaymentStatus, Plan, PlanId, RepositoryError, Role, Timestamp, User, UserId,
};
use tokio::sync::Mutex;

use crate::{
    clock::Clock,
    repository::{
        AccountDirectory, DatabaseProbe, LedgerUnitOfWork, PaymentHistory, PaymentLedgerStore,
        PoolSnapshot,
    },
};

/// 可注入的故障
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// 写入缴费记录之后、更新用户之前失败
    pub fail_mark_paid: bool,
    pub fail_commit: bool,
    /// 在更新用户之前等待，用于触发事务超时
    pub delay_before_mark_paid: Option<Duration>,
    /// 模拟数据库不可达
    pub unavailable: bool,
}

#[derive(Debug, Default)]
struct State {
    plans: BTreeMap<PlanId, Plan>,
    users: BTreeMap<UserId, User>,
    payments: Vec<Payment>,
    next_plan_id: i64,
    next_user_id: i64,
    next_payment_id: i64,
}

impl State {
    fn allocate_payment_id(&mut self) -> PaymentId {
        self.next_payment_id += 1;
        PaymentId::new(self.next_payment_id)
    }
}

#[derive(Debug, Default)]
struct Counters {
    begun: AtomicU64,
    committed: AtomicU64,
    rolled_back: AtomicU64,
    open_units: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
    faults: Arc<std::sync::Mutex<Faults>>,
    counters: Arc<Counters>,
    plan_reads: Arc<AtomicU64>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_faults(&self, faults: Faults) {
        if let Ok(mut guard) = self.faults.lock() {
            *guard = faults;
        }
    }

    fn faults(&self) -> Faults {
        self.faults
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.faults().unavailable {
            return Err(RepositoryError::unavailable("connection refused"));
        }
        Ok(())
    }

    pub async fn seed_plan(&self, name: &str, can_access_client_panel: bool) -> PlanId {
        let mut state = self.state.lock().await;
        state.next_plan_id += 1;
        let id = PlanId::new(state.next_plan_id);
        state.plans.insert(
            id,
            Plan {
                id,
                name: name.to_string(),
                can_access_client_panel,
            },
        );
        id
    }

    /// 修改套餐权限，模拟注册后套餐能力变化
    pub async fn set_plan_access(&self, id: PlanId, can_access_client_panel: bool) {
        if let Some(plan) = self.state.lock().await.plans.get_mut(&id) {
            plan.can_access_client_panel = can_access_client_panel;
        }
    }

    /// 插入一个非客户账户（例如历史遗留的无套餐管理员）
    pub async fn seed_admin(&self, name: &str, dni: &str) -> User {
        let mut state = self.state.lock().await;
        state.next_user_id += 1;
        let user = User {
            id: UserId::new(state.next_user_id),
            name: name.to_string(),
            dni: Dni::parse(dni).expect("valid dni"),
            email: None,
            phone: None,
            role: Role::Admin,
            plan_id: None,
            status: AccountStatus::Active,
            payment_status: PaymentStatus::Unpaid,
            next_payment_date: None,
            created_at: Timestamp::default(),
        };
        state.users.insert(user.id, user.clone());
        user
    }

    pub async fn remove_user(&self, id: UserId) {
        self.state.lock().await.users.remove(&id);
    }

    pub async fn user(&self, id: UserId) -> Option<User> {
        self.state.lock().await.users.get(&id).cloned()
    }

    pub async fn payments(&self) -> Vec<Payment> {
        self.state.lock().await.payments.clone()
    }

    pub fn plan_reads(&self) -> u64 {
        self.plan_reads.load(Ordering::SeqCst)
    }

    pub fn begun(&self) -> u64 {
        self.counters.begun.load(Ordering::SeqCst)
    }

    pub fn committed(&self) -> u64 {
        self.counters.committed.load(Ordering::SeqCst)
    }

    pub fn rolled_back(&self) -> u64 {
        self.counters.rolled_back.load(Ordering::SeqCst)
    }

    /// 尚未释放的事务数；每条退出路径结束后都应回到 0
    pub fn open_units(&self) -> usize {
        self.counters.open_units.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountDirectory for InMemoryStore {
    async fn find_by_dni(&self, dni: &Dni) -> Result<Option<User>, RepositoryError> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| &u.dni == dni).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        self.check_available()?;
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_plan(&self, id: PlanId) -> Result<Option<Plan>, RepositoryError> {
        self.check_available()?;
        self.plan_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.lock().await.plans.get(&id).cloned())
    }

    async fn create_client(&self, client: NewClient) -> Result<User, RepositoryError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.dni == client.dni) {
            return Err(RepositoryError::conflict("users_dni_key"));
        }
        if !state.plans.contains_key(&client.plan_id) {
            return Err(RepositoryError::NotFound);
        }
        state.next_user_id += 1;
        let user = User {
            id: UserId::new(state.next_user_id),
            name: client.name.as_str().to_string(),
            dni: client.dni,
            email: client.email.map(|e| e.as_str().to_string()),
            phone: client.phone,
            role: NewClient::ROLE,
            plan_id: Some(client.plan_id),
            status: NewClient::STATUS,
            payment_status: NewClient::PAYMENT_STATUS,
            next_payment_date: None,
            created_at: chrono::Utc::now(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn list_clients(&self) -> Result<Vec<User>, RepositoryError> {
        self.check_available()?;
        let state = self.state.lock().await;
        let mut clients: Vec<User> = state
            .users
            .values()
            .filter(|u| u.is_client())
            .cloned()
            .collect();
        clients.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(clients)
    }

    async fn count_users(&self) -> Result<i64, RepositoryError> {
        self.check_available()?;
        Ok(self.state.lock().await.users.len() as i64)
    }
}

/// 暂存写入的内存事务
struct InMemoryUnitOfWork {
    store: InMemoryStore,
    staged_payments: Vec<Payment>,
    staged_updates: Vec<(UserId, Date)>,
}

impl Drop for InMemoryUnitOfWork {
    fn drop(&mut self) {
        self.store.counters.open_units.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LedgerUnitOfWork for InMemoryUnitOfWork {
    async fn insert_payment(&mut self, payment: NewPayment) -> Result<Payment, RepositoryError> {
        let mut state = self.store.state.lock().await;
        let duplicate = state
            .payments
            .iter()
            .chain(self.staged_payments.iter())
            .any(|p| p.user_id == payment.user_id && p.month == payment.month);
        if duplicate {
            return Err(RepositoryError::conflict("payments_user_month_key"));
        }
        if !state.users.contains_key(&payment.user_id) {
            return Err(RepositoryError::NotFound);
        }

        // 与数据库序列一样，回滚不会归还已分配的 id
        let stored = Payment {
            id: state.allocate_payment_id(),
            user_id: payment.user_id,
            amount: payment.amount,
            payment_date: payment.payment_date,
            month: payment.month,
            created_at: chrono::Utc::now(),
        };
        self.staged_payments.push(stored.clone());
        Ok(stored)
    }

    async fn mark_paid(
        &mut self,
        user_id: UserId,
        next_payment_date: Date,
    ) -> Result<(), RepositoryError> {
        let faults = self.store.faults();
        if let Some(delay) = faults.delay_before_mark_paid {
            tokio::time::sleep(delay).await;
        }
        if faults.fail_mark_paid {
            return Err(RepositoryError::storage("injected failure before update"));
        }
        if !self.store.state.lock().await.users.contains_key(&user_id) {
            return Err(RepositoryError::NotFound);
        }
        self.staged_updates.push((user_id, next_payment_date));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        if self.store.faults().fail_commit {
            self.store.counters.rolled_back.fetch_add(1, Ordering::SeqCst);
            return Err(RepositoryError::storage("injected commit failure"));
        }
        let mut state = self.store.state.lock().await;
        state.payments.extend(self.staged_payments.iter().cloned());
        for (user_id, next) in &self.staged_updates {
            if let Some(user) = state.users.get_mut(user_id) {
                user.payment_status = PaymentStatus::Paid;
                user.next_payment_date = Some(*next);
            }
        }
        self.store.counters.committed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError> {
        self.store.counters.rolled_back.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl PaymentLedgerStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn LedgerUnitOfWork>, RepositoryError> {
        self.check_available()?;
        self.counters.begun.fetch_add(1, Ordering::SeqCst);
        self.counters.open_units.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InMemoryUnitOfWork {
            store: self.clone(),
            staged_payments: Vec::new(),
            staged_updates: Vec::new(),
        }))
    }
}

#[async_trait]
impl PaymentHistory for InMemoryStore {
    async fn list_history(&self, limit: u32) -> Result<Vec<PaymentHistoryEntry>, RepositoryError> {
        self.check_available()?;
        let state = self.state.lock().await;
        let mut entries: Vec<PaymentHistoryEntry> = state
            .payments
            .iter()
            .filter_map(|payment| {
                state.users.get(&payment.user_id).map(|user| PaymentHistoryEntry {
                    payment: payment.clone(),
                    user_name: user.name.clone(),
                })
            })
            .collect();
        entries.sort_by(|a, b| {
            b.payment
                .payment_date
                .cmp(&a.payment.payment_date)
                .then(b.payment.id.cmp(&a.payment.id))
        });
        entries.truncate(limit as usize);
        Ok(entries)
    }
}

#[async_trait]
impl DatabaseProbe for InMemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        self.check_available()
    }

    async fn arithmetic_check(&self) -> Result<i64, RepositoryError> {
        self.check_available()?;
        Ok(2)
    }

    fn pool_snapshot(&self) -> PoolSnapshot {
        let open = self.open_units() as u64;
        PoolSnapshot {
            size: 1,
            idle: if open == 0 { 1 } else { 0 },
            in_use: open,
            acquired: self.begun(),
            released: self.begun().saturating_sub(open),
            enqueued: 0,
        }
    }
}

/// 固定时间的时钟
#[derive(Debug, Clone)]
pub struct FixedClock {
    pub now: Timestamp,
    pub today: Date,
}

impl FixedClock {
    pub fn on(today: Date) -> Self {
        let now = today
            .and_hms_opt(12, 0, 0)
            .map(|naive| naive.and_utc())
            .unwrap_or_default();
        Self { now, today }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.now
    }

    fn today(&self) -> Date {
        self.today
    }
}
