//! 统一配置中心
//!
//! 提供应用的全局配置管理，包括：
//! - 运行环境（development / production）
//! - HTTP 服务监听
//! - 数据库连接与连接池
//! - 支付事务超时
//!
//! 加载顺序：默认值 -> `APP_CONFIG_FILE` 指定的文件 -> 部署环境变量
//! (`DB_HOST`, `PORT`, `NODE_ENV` ...) -> `APP_` 前缀的嵌套覆盖 (`APP_DATABASE__MAX_CONNECTIONS`)。

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// 运行环境
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// 数据库 TLS 模式，与 libpq 的 `sslmode` 取值一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SslMode {
    Disable,
    Prefer,
    Require,
    VerifyCa,
    VerifyFull,
}

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[serde(default)]
    pub environment: Environment,
    #[validate(nested)]
    pub server: ServerConfig,
    #[validate(nested)]
    pub database: DatabaseConfig,
    #[validate(nested)]
    pub ledger: LedgerConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DatabaseConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
    #[validate(length(min = 1))]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(range(min = 1, max = 1000))]
    pub max_connections: u32,
    #[validate(range(min = 1))]
    pub acquire_timeout_secs: u64,
    /// 未设置时按运行环境推导，见 [`DatabaseConfig::effective_ssl_mode`]
    #[serde(default)]
    pub ssl_mode: Option<SslMode>,
    #[serde(default)]
    pub ssl_root_cert: Option<String>,
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

/// 支付账本配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LedgerConfig {
    /// 单个支付事务（开始到提交）的最长时间
    #[validate(range(min = 1, max = 300))]
    pub transaction_timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

/// 部署环境里沿用的扁平变量名 -> 配置路径
const STRING_VARS: &[(&str, &str)] = &[
    ("DB_HOST", "database.host"),
    ("DB_USER", "database.user"),
    ("DB_PASSWORD", "database.password"),
    ("DB_NAME", "database.name"),
    ("DB_SSL_MODE", "database.ssl_mode"),
    ("DB_SSL_ROOT_CERT", "database.ssl_root_cert"),
    ("HOST", "server.host"),
];

const NUMERIC_VARS: &[(&str, &str)] = &[
    ("DB_PORT", "database.port"),
    ("DB_MAX_CONNECTIONS", "database.max_connections"),
    ("DB_ACQUIRE_TIMEOUT_SECS", "database.acquire_timeout_secs"),
    ("PORT", "server.port"),
    ("TRANSACTION_TIMEOUT_SECS", "ledger.transaction_timeout_secs"),
];

/// 运行环境变量，`APP_ENV` 优先于 `NODE_ENV`
const ENVIRONMENT_VARS: &[&str] = &["NODE_ENV", "APP_ENV"];

impl Default for AppConfig {
    /// 开发环境默认值
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".into(),
                port: 3001,
                cors_origins: vec!["*".into()],
            },
            database: DatabaseConfig {
                host: "127.0.0.1".into(),
                port: 5432,
                user: "postgres".into(),
                password: String::new(),
                name: "club".into(),
                max_connections: 10,
                acquire_timeout_secs: 30,
                ssl_mode: None,
                ssl_root_cert: None,
                run_migrations: true,
            },
            ledger: LedgerConfig {
                transaction_timeout_secs: 10,
            },
        }
    }
}

impl AppConfig {
    /// 从默认值、可选配置文件和进程环境变量加载配置
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment()?)
    }

    /// 构造完整的配置来源链，便于调用方追加自己的 provider
    pub fn figment() -> Result<Figment, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

        if let Ok(path) = std::env::var("APP_CONFIG_FILE") {
            figment = if path.ends_with(".yml") || path.ends_with(".yaml") {
                figment.merge(Yaml::file(path))
            } else if path.ends_with(".json") {
                figment.merge(Json::file(path))
            } else {
                figment.merge(Toml::file(path))
            };
        }

        for (var, key) in STRING_VARS {
            if let Ok(value) = std::env::var(var) {
                figment = figment.merge(Serialized::default(key, value));
            }
        }

        for (var, key) in NUMERIC_VARS {
            if let Ok(value) = std::env::var(var) {
                let parsed: u64 = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    variable: (*var).to_string(),
                    value: value.clone(),
                })?;
                figment = figment.merge(Serialized::default(key, parsed));
            }
        }

        for var in ENVIRONMENT_VARS {
            if let Ok(value) = std::env::var(var) {
                figment = figment.merge(Serialized::default(
                    "environment",
                    value.trim().to_ascii_lowercase(),
                ));
            }
        }

        Ok(figment.merge(Env::prefixed("APP_").split("__")))
    }

    /// 提取并校验
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: AppConfig = figment
            .extract()
            .map_err(|err| ConfigError::Load(err.to_string()))?;
        config.validate()?;
        config.check_security()?;
        Ok(config)
    }

    /// 生产环境安全检查：不能关闭 TLS，不能用空密码
    fn check_security(&self) -> Result<(), ConfigError> {
        if !self.environment.is_production() {
            return Ok(());
        }
        if self.database.effective_ssl_mode(self.environment) == SslMode::Disable {
            return Err(ConfigError::InvalidDatabaseConfig(
                "TLS cannot be disabled in production".into(),
            ));
        }
        if self.database.password.is_empty() {
            return Err(ConfigError::InvalidDatabaseConfig(
                "DB_PASSWORD is required in production".into(),
            ));
        }
        Ok(())
    }

    /// 脱敏后的配置描述（用于日志）
    pub fn sanitize(&self) -> String {
        let mut copy = self.clone();
        if !copy.database.password.is_empty() {
            copy.database.password = "[REDACTED]".into();
        }
        format!("{:?}", copy)
    }
}

impl DatabaseConfig {
    /// 显式配置优先；否则生产环境校验证书，开发环境尽量使用 TLS 但不校验
    pub fn effective_ssl_mode(&self, environment: Environment) -> SslMode {
        match (self.ssl_mode, environment) {
            (Some(mode), _) => mode,
            (None, Environment::Production) => SslMode::VerifyFull,
            (None, Environment::Development) => SslMode::Prefer,
        }
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(String),
    #[error("invalid value {value:?} for {variable}")]
    InvalidValue { variable: String, value: String },
    #[error("invalid database configuration: {0}")]
    InvalidDatabaseConfig(String),
    #[error("configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}
