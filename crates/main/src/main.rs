//! 主应用程序入口
//!
//! 加载配置、建立连接池并启动 Axum Web API 服务。

use std::{sync::Arc, time::Duration};

use application::{
    AuthService, AuthServiceDependencies, ClientService, ClientServiceDependencies, Clock,
    PaymentService, PaymentServiceDependencies, SystemClock, SystemService,
    SystemServiceDependencies,
};
use config::AppConfig;
use infrastructure::{verify_connection, Infrastructure};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 文件可选
    dotenvy::dotenv().ok();

    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;
    tracing::info!(config = %config.sanitize(), "configuration loaded");

    let infra = Infrastructure::connect(&config);

    // 迁移与连接检查：生产环境失败即退出，开发环境继续提供服务
    let startup = async {
        if config.database.run_migrations {
            infra.run_migrations().await?;
        }
        verify_connection(&infra.pool).await
    }
    .await;

    if let Err(err) = startup {
        if config.environment.is_production() {
            tracing::error!(error = %err, "database startup check failed, aborting");
            infra.pool.close().await;
            return Err(err.into());
        }
        tracing::warn!(error = %err, "database startup check failed, continuing in development");
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::default());

    let auth_service = AuthService::new(AuthServiceDependencies {
        directory: infra.directory_trait(),
    });
    let client_service = ClientService::new(ClientServiceDependencies {
        directory: infra.directory_trait(),
    });
    let payment_service = PaymentService::new(PaymentServiceDependencies {
        directory: infra.directory_trait(),
        ledger: infra.ledger_trait(),
        history: infra.history_trait(),
        clock: clock.clone(),
        transaction_timeout: Duration::from_secs(config.ledger.transaction_timeout_secs),
    });
    let system_service = SystemService::new(SystemServiceDependencies {
        directory: infra.directory_trait(),
        probe: infra.probe_trait(),
        clock,
    });

    let state = AppState::new(
        Arc::new(auth_service),
        Arc::new(client_service),
        Arc::new(payment_service),
        Arc::new(system_service),
        config.environment,
    );

    let app = router(state, &config.server.cors_origins);
    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        %address,
        environment = config.environment.as_str(),
        "club server listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    infra.pool.close().await;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
