//! 部署请求相关领域模型

use serde::Serialize;
use tempfile::TempPath;

/// 已保存文件记录（返回给客户端的清单项）
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    /// 相对于部署根目录下 export_type 的路径
    pub path: String,
    pub content_type: String,
    pub size: u64,
}

/// 已缓存到临时存储的上传文件
///
/// 临时文件在值被 drop 时删除
#[derive(Debug)]
pub struct SpooledFile {
    /// 客户端提供的原始文件名（可能包含目录部分）
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub path: TempPath,
}

/// 解析后的部署请求
#[derive(Debug, Default)]
pub struct DeployRequest {
    pub export_type: String,
    pub relative_path: String,
    /// `init=true`，站点模板初始化
    pub init: bool,
    /// 预置模板目录名（`template` 字段）
    pub template: Option<String>,
    /// 模板 ZIP（`template_zip` 字段）
    pub archive: Option<SpooledFile>,
    /// 普通上传文件，按提交顺序
    pub files: Vec<SpooledFile>,
}

/// 部署成功结果
#[derive(Debug)]
pub enum DeployOutcome {
    /// 模板初始化完成（无文件清单）
    Initialized { message: String },
    /// 普通上传完成
    Saved {
        message: String,
        files: Vec<FileRecord>,
    },
}

impl DeployOutcome {
    pub fn message(&self) -> &str {
        match self {
            DeployOutcome::Initialized { message } | DeployOutcome::Saved { message, .. } => {
                message
            }
        }
    }
}
