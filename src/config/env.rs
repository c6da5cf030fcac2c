//! 配置加载
//!
//! 先读取可选的 JSON 配置文件，再用环境变量覆盖

use anyhow::{bail, Context};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use tracing::warn;

use self::constants::{DEFAULT_DEPLOYMENT_PATH, DEFAULT_LOG_PATH, DEFAULT_PORT};
use crate::infra::path_guard;

/// JSON 配置文件结构（所有字段可选）
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub auth_token: Option<String>,
    pub deployment_path: Option<String>,
    /// 原配置文件中端口是字符串，这里两种写法都接受
    pub port: Option<PortValue>,
    pub allowed_origins: Option<String>,
    pub log_path: Option<String>,
    pub export_type: Option<String>,
    pub templates_dir: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum PortValue {
    Number(u16),
    Text(String),
}

impl PortValue {
    fn as_port(&self) -> Option<u16> {
        match self {
            PortValue::Number(p) => Some(*p),
            PortValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl FileConfig {
    /// 读取配置文件；文件不存在时返回默认值
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file found");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

/// 运行配置
#[derive(Clone, Debug)]
pub struct EnvConfig {
    /// Bearer token
    pub auth_token: String,
    /// 部署根目录
    pub deployment_path: PathBuf,
    /// 服务监听端口
    pub port: u16,
    /// CORS 允许的来源，空表示不发送 CORS 头
    pub allowed_origins: Option<String>,
    /// 日志目录
    pub log_path: PathBuf,
    /// 默认 export type
    pub export_type: Option<String>,
    /// 预置站点模板目录
    pub templates_dir: Option<PathBuf>,
}

impl EnvConfig {
    /// 从配置文件和进程环境变量加载
    pub fn load(config_file: &Path) -> anyhow::Result<Self> {
        let file = FileConfig::read(config_file)?;
        let config = Self::from_sources(file, |key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// 旧版环境变量仍然生效，但启动时提示迁移
    pub fn warn_deprecated_vars() {
        if env::var("AUTH_TOKEN").is_ok() || env::var("DEPLOYMENT_PATH").is_ok() {
            warn!("Deprecated environment variables detected. Please use DEPLOY_AUTH_TOKEN and DEPLOY_PATH");
        }
    }

    /// 合并配置文件与环境变量（环境变量优先）
    pub fn from_sources(file: FileConfig, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let with_fallback = |primary: &str, fallback: &str| {
            non_empty(primary).or_else(|| non_empty(fallback))
        };

        let auth_token = with_fallback("DEPLOY_AUTH_TOKEN", "AUTH_TOKEN")
            .or(file.auth_token)
            .unwrap_or_default();

        let deployment_path = with_fallback("DEPLOY_PATH", "DEPLOYMENT_PATH")
            .or(file.deployment_path)
            .unwrap_or_else(|| DEFAULT_DEPLOYMENT_PATH.to_string());

        let port = non_empty("PORT")
            .and_then(|v| v.parse().ok())
            .or_else(|| file.port.as_ref().and_then(PortValue::as_port))
            .unwrap_or(DEFAULT_PORT);

        let allowed_origins = non_empty("ALLOWED_ORIGINS")
            .or(file.allowed_origins)
            .filter(|v| !v.is_empty());

        let log_path = non_empty("LOG_PATH")
            .or(file.log_path)
            .unwrap_or_else(|| DEFAULT_LOG_PATH.to_string());

        let export_type = non_empty("EXPORT_TYPE")
            .or(file.export_type)
            .filter(|v| !v.is_empty());

        let templates_dir = non_empty("TEMPLATES_DIR")
            .or(file.templates_dir)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        Self {
            auth_token,
            deployment_path: PathBuf::from(deployment_path),
            port,
            allowed_origins,
            log_path: PathBuf::from(log_path),
            export_type,
            templates_dir,
        }
    }

    /// 启动前校验
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.auth_token.is_empty() {
            bail!("auth token is not configured (set DEPLOY_AUTH_TOKEN or auth_token in the config file)");
        }
        if let Some(export_type) = self.export_type.as_deref() {
            if path_guard::base_name(export_type) != Some(export_type) {
                bail!("export type {:?} must be a single path segment", export_type);
            }
        }
        Ok(())
    }

    /// 确保部署根目录存在，并规范化为绝对路径
    pub fn prepare_deployment_root(&mut self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.deployment_path).with_context(|| {
            format!(
                "failed to create deployment directory {}",
                self.deployment_path.display()
            )
        })?;
        let canonical = self.deployment_path.canonicalize().with_context(|| {
            format!("failed to resolve {}", self.deployment_path.display())
        })?;
        if !canonical.is_dir() {
            bail!("deployment path {} is not a directory", canonical.display());
        }
        self.deployment_path = canonical;
        Ok(())
    }
}

/// 常量
pub mod constants {
    /// 默认监听端口
    pub const DEFAULT_PORT: u16 = 8080;

    /// 默认部署根目录
    pub const DEFAULT_DEPLOYMENT_PATH: &str = "deployments";

    /// 默认日志目录
    pub const DEFAULT_LOG_PATH: &str = "logs";

    /// 日志文件名
    pub const LOG_FILE_NAME: &str = "deployment_server.log";

    /// 默认配置文件
    pub const DEFAULT_CONFIG_FILE: &str = "config.json";

    /// 未指定 export_type 且配置也为空时使用
    pub const DEFAULT_EXPORT_TYPE: &str = "hugo";

    /// 请求体上限 100 MiB
    pub const MAX_BODY_BYTES: usize = 100 << 20;

    /// 版本号
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}
