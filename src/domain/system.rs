//! 服务信息相关领域模型

use serde::Serialize;

/// `/info` 响应
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// 部署根目录
    pub deployment_path: String,
    /// 服务器当前时间（RFC3339）
    pub server_time: String,
    pub version: &'static str,
}
