//! 统一错误处理
//!
//! 提供 `ApiError` 枚举实现 `IntoResponse`，所有失败都以 `{success: false, message}` 信封返回

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::api::response::{respond, ApiResponse};

/// 统一 API 错误类型
#[derive(Debug)]
pub enum ApiError {
    /// 401 - 未授权（缺少 Bearer 头或 token 不匹配）
    Unauthorized(String),
    /// 400 - 请求无效
    BadRequest(String),
    /// 405 - 方法不允许
    MethodNotAllowed,
    /// 500 - 内部错误
    Internal(String),
}

impl ApiError {
    /// 创建未授权错误
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// 创建请求无效错误
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// 对应的 HTTP 状态码
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回给客户端的消息
    pub fn message(&self) -> String {
        match self {
            ApiError::Unauthorized(m) | ApiError::BadRequest(m) | ApiError::Internal(m) => {
                m.clone()
            }
            ApiError::MethodNotAllowed => "Method not allowed".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        respond(self.status(), ApiResponse::failure(self.message()))
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Unauthorized(m) => write!(f, "Unauthorized: {}", m),
            ApiError::BadRequest(m) => write!(f, "Bad request: {}", m),
            ApiError::MethodNotAllowed => write!(f, "Method not allowed"),
            ApiError::Internal(m) => write!(f, "Internal error: {}", m),
        }
    }
}

impl std::error::Error for ApiError {}

/// 便捷类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::bad_request("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::MethodNotAllowed.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(ApiError::internal("x").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_message() {
        assert_eq!(ApiError::unauthorized("Invalid token").message(), "Invalid token");
        assert_eq!(ApiError::MethodNotAllowed.message(), "Method not allowed");
    }

    #[test]
    fn test_into_response_status() {
        let resp = ApiError::bad_request("No files sent").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "application/json"
        );
    }
}
