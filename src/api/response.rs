//! 统一 JSON 响应信封

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::domain::deploy::FileRecord;

/// 标准 API 响应结构
///
/// `files` 仅在上传清单场景下出现
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileRecord>>,
}

impl ApiResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            files: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            files: None,
        }
    }

    /// 附带已保存文件清单
    pub fn with_files(mut self, files: Vec<FileRecord>) -> Self {
        self.files = Some(files);
        self
    }
}

/// 以给定状态码写出 JSON 响应
pub fn respond(status: StatusCode, body: ApiResponse) -> Response {
    (status, Json(body)).into_response()
}
