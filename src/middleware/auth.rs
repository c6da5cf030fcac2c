//! Bearer token 认证中间件
//!
//! 所有路由都经过 `auth_gate`：先处理 CORS 和预检请求，再用常数时间比较校验 token。
//! 通过 `axum::middleware::from_fn_with_state` 显式挂在路由上。

use axum::{
    extract::{Request, State},
    http::{
        header::{
            HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, AUTHORIZATION,
        },
        Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::error::ApiError;
use crate::state::AppState;

const BEARER_PREFIX: &str = "Bearer ";
const ALLOWED_METHODS: &str = "POST, GET, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization";

/// 认证结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// CORS 预检，直接返回 200
    Preflight,
    /// token 正确，放行到 handler
    Admitted,
}

/// 判断请求是否放行
///
/// `OPTIONS` 不做认证；其余请求必须携带 `Authorization: Bearer <token>`
pub fn admit(method: &Method, headers: &HeaderMap, expected: &str) -> Result<Admission, ApiError> {
    if *method == Method::OPTIONS {
        return Ok(Admission::Preflight);
    }

    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix(BEARER_PREFIX));

    let Some(token) = token else {
        tracing::warn!("Missing or malformed Authorization header");
        return Err(ApiError::unauthorized("Invalid authentication"));
    };

    if tokens_match(token, expected) {
        Ok(Admission::Admitted)
    } else {
        tracing::warn!("Invalid token provided");
        Err(ApiError::unauthorized("Invalid token"))
    }
}

/// 常数时间比较，耗时与首个不同字节的位置无关
pub fn tokens_match(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// 配置了允许来源时附加 CORS 头
pub fn apply_cors_headers(headers: &mut HeaderMap, allowed_origin: Option<&str>) {
    let Some(origin) = allowed_origin else {
        return;
    };
    match HeaderValue::from_str(origin) {
        Ok(value) => {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
            headers.insert(
                ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static(ALLOWED_METHODS),
            );
            headers.insert(
                ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static(ALLOWED_HEADERS),
            );
        }
        Err(e) => tracing::warn!(origin = %origin, error = %e, "Allowed origin is not a valid header value"),
    }
}

/// 认证中间件
pub async fn auth_gate(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = match admit(request.method(), request.headers(), state.auth_token()) {
        Ok(Admission::Preflight) => StatusCode::OK.into_response(),
        Ok(Admission::Admitted) => next.run(request).await,
        Err(e) => e.into_response(),
    };

    apply_cors_headers(response.headers_mut(), state.allowed_origin());
    response
}
