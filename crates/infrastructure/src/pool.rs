//! 有界数据库连接池。
//!
//! 包装 sqlx 的 `PgPool`：池满时请求排队等待（FIFO）而不是立即失败；
//! 每次取出/归还连接、以及因池满而排队，都会记录事件（`tracing` + 计数器）。
//! 连接的归还由 [`PoolLease`] 的 `Drop` 保证，覆盖成功、业务错误、panic 和超时取消。

use std::{
    ops::{Deref, DerefMut},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use application::PoolSnapshot;
use config::{DatabaseConfig, Environment, SslMode};
use domain::RepositoryError;
use sqlx::{
    pool::PoolConnection,
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    PgConnection, PgPool, Postgres,
};

use crate::{error::map_sqlx_err, unit_of_work::PgUnitOfWork};

/// 连接池事件计数
#[derive(Debug, Default)]
pub struct PoolMonitor {
    acquired: AtomicU64,
    released: AtomicU64,
    enqueued: AtomicU64,
}

/// 计数器快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub acquired: u64,
    pub released: u64,
    pub enqueued: u64,
}

impl PoolStats {
    pub fn in_use(&self) -> u64 {
        self.acquired.saturating_sub(self.released)
    }
}

impl PoolMonitor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            acquired: self.acquired.load(Ordering::SeqCst),
            released: self.released.load(Ordering::SeqCst),
            enqueued: self.enqueued.load(Ordering::SeqCst),
        }
    }

    pub(crate) fn record_enqueue(&self, size: u32, max_connections: u32) {
        self.enqueued.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(size, max_connections, "pool saturated, request queued");
    }

    /// 记录取出事件并返回租约；租约被丢弃时记录归还
    pub(crate) fn lease(self: &Arc<Self>, waited: Duration) -> PoolLease {
        let lease_id = self.acquired.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(lease_id, waited_ms = waited.as_millis() as u64, "connection acquired");
        PoolLease {
            monitor: Arc::clone(self),
            lease_id,
            acquired_at: Instant::now(),
        }
    }

    fn record_release(&self, lease_id: u64, held: Duration) {
        self.released.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(lease_id, held_ms = held.as_millis() as u64, "connection released");
    }
}

/// 一次连接占用。恰好在被丢弃时记录一次归还事件。
#[derive(Debug)]
pub struct PoolLease {
    monitor: Arc<PoolMonitor>,
    lease_id: u64,
    acquired_at: Instant,
}

impl PoolLease {
    pub fn id(&self) -> u64 {
        self.lease_id
    }
}

impl Drop for PoolLease {
    fn drop(&mut self) {
        self.monitor
            .record_release(self.lease_id, self.acquired_at.elapsed());
    }
}

/// 从池中取出的连接。丢弃时连接回到池中。
pub struct PooledConnection {
    // 字段按声明顺序丢弃：先归还连接，再记录事件
    conn: PoolConnection<Postgres>,
    _lease: PoolLease,
}

impl Deref for PooledConnection {
    type Target = PgConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

/// 进程级连接池句柄：启动时显式创建，注入给各适配器，退出时 [`ConnectionPool::close`]。
#[derive(Clone)]
pub struct ConnectionPool {
    pool: PgPool,
    monitor: Arc<PoolMonitor>,
}

impl ConnectionPool {
    /// 按配置创建连接池。连接是惰性建立的，不可达的数据库会在第一次取连接时报错。
    pub fn connect(config: &DatabaseConfig, environment: Environment) -> Self {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_lazy_with(connect_options(config, environment));

        tracing::info!(
            host = %config.host,
            port = config.port,
            database = %config.name,
            max_connections = config.max_connections,
            "database pool configured"
        );

        Self::from_pool(pool)
    }

    /// 包装一个已有的 sqlx 连接池
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            monitor: PoolMonitor::new(),
        }
    }

    pub fn max_connections(&self) -> u32 {
        self.pool.options().get_max_connections()
    }

    fn note_saturation(&self) {
        let max_connections = self.max_connections();
        let size = self.pool.size();
        if size >= max_connections && self.pool.num_idle() == 0 {
            self.monitor.record_enqueue(size, max_connections);
        }
    }

    /// 取出一个连接；池满时排队等待，直到 `acquire_timeout`
    pub async fn acquire(&self) -> Result<PooledConnection, RepositoryError> {
        self.acquire_raw().await.map_err(map_sqlx_err)
    }

    /// 同 `acquire`，保留 sqlx 原始错误以便生成排查提示
    pub(crate) async fn acquire_raw(&self) -> Result<PooledConnection, sqlx::Error> {
        self.note_saturation();
        let started = Instant::now();
        let conn = self.pool.acquire().await?;
        Ok(PooledConnection {
            conn,
            _lease: self.monitor.lease(started.elapsed()),
        })
    }

    /// 在专用连接上开启事务
    pub async fn begin(&self) -> Result<PgUnitOfWork, RepositoryError> {
        self.note_saturation();
        let started = Instant::now();
        let tx = self.pool.begin().await.map_err(map_sqlx_err)?;
        Ok(PgUnitOfWork::new(tx, self.monitor.lease(started.elapsed())))
    }

    pub fn stats(&self) -> PoolStats {
        self.monitor.stats()
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        let stats = self.stats();
        PoolSnapshot {
            size: self.pool.size(),
            idle: self.pool.num_idle() as u32,
            in_use: stats.in_use(),
            acquired: stats.acquired,
            released: stats.released,
            enqueued: stats.enqueued,
        }
    }

    /// 底层 sqlx 连接池，用于迁移
    pub fn pg_pool(&self) -> &PgPool {
        &self.pool
    }

    /// 关闭连接池，等待已借出的连接归还
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!(stats = ?self.stats(), "database pool closed");
    }
}

fn connect_options(config: &DatabaseConfig, environment: Environment) -> PgConnectOptions {
    let mut options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .database(&config.name)
        .ssl_mode(pg_ssl_mode(config.effective_ssl_mode(environment)));

    if !config.password.is_empty() {
        options = options.password(&config.password);
    }
    if let Some(cert) = &config.ssl_root_cert {
        options = options.ssl_root_cert(cert.as_str());
    }
    options
}

fn pg_ssl_mode(mode: SslMode) -> PgSslMode {
    match mode {
        SslMode::Disable => PgSslMode::Disable,
        SslMode::Prefer => PgSslMode::Prefer,
        SslMode::Require => PgSslMode::Require,
        SslMode::VerifyCa => PgSslMode::VerifyCa,
        SslMode::VerifyFull => PgSslMode::VerifyFull,
    }
}
