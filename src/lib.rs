//! Site Deploy Agent - 静态站点部署代理
//!
//! 接收 Bearer token 保护的文件上传和 ZIP 站点模板，写入部署目录

pub mod error;
pub mod middleware;
pub mod infra;
pub mod domain;
pub mod config;
pub mod state;
pub mod api;
pub mod services;

use anyhow::Context;
use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::env::constants::{DEFAULT_CONFIG_FILE, LOG_FILE_NAME, VERSION};
use crate::config::EnvConfig;
use crate::state::AppState;

/// 命令行运行参数
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// `--port` 覆盖监听端口
    pub port_override: Option<u16>,
    /// `--config` 指定配置文件
    pub config_path: Option<PathBuf>,
}

/// 初始化日志：同时输出到控制台和 `<log_path>/deployment_server.log`
pub fn init_logging(log_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(LOG_FILE_NAME))
        .context("failed to open log file")?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(log_file)))
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(())
}

/// 加载配置、初始化日志并启动 HTTP 服务，直到收到退出信号
pub async fn init_and_run_agent_with_config(runtime: RuntimeConfig) -> anyhow::Result<()> {
    let config_path = runtime
        .config_path
        .or_else(|| std::env::var("DEPLOY_CONFIG").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut config = EnvConfig::load(&config_path)?;
    if let Some(port) = runtime.port_override {
        config.port = port;
    }

    init_logging(&config.log_path)?;
    tracing::info!("Site Deploy Agent v{}", VERSION);
    EnvConfig::warn_deprecated_vars();

    config.prepare_deployment_root()?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = Arc::new(AppState::new(config));
    let app = api::router(state.clone());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!("Deployment API server running on port {}...", addr.port());
    tracing::info!(
        "Deployment path: {}",
        state.config.deployment_path.display()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

/// 等待 Ctrl-C 或 SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
