//! 应用状态

use crate::config::EnvConfig;
use crate::services::intake::UploadIntake;

/// 应用状态
///
/// 只保存启动时确定的只读配置，请求之间不共享可变状态
pub struct AppState {
    /// 运行配置
    pub config: EnvConfig,
    /// 上传处理
    pub intake: UploadIntake,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(config: EnvConfig) -> Self {
        tracing::info!(
            auth_token_len = config.auth_token.len(),
            deployment_path = %config.deployment_path.display(),
            port = config.port,
            allowed_origins = ?config.allowed_origins,
            export_type = ?config.export_type,
            templates_dir = ?config.templates_dir,
            "Loaded configuration"
        );

        let intake = UploadIntake::from_config(&config);

        Self { config, intake }
    }

    /// 配置的 Bearer token
    pub fn auth_token(&self) -> &str {
        &self.config.auth_token
    }

    /// CORS 允许来源
    pub fn allowed_origin(&self) -> Option<&str> {
        self.config.allowed_origins.as_deref()
    }
}
