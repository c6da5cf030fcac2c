//! API 模块
//!
//! HTTP handlers 和路由组装

pub mod deploy;
pub mod health;
pub mod response;

use axum::{extract::DefaultBodyLimit, middleware, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::env::constants::MAX_BODY_BYTES;
use crate::middleware::auth_gate;
use crate::state::AppState;

/// 构建完整的 API 路由
///
/// 所有端点都需要 Bearer token；请求体上限在解析 multipart 之前生效
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health & Info
        .merge(health::router())
        // Deploy
        .merge(deploy::router())
        // Middleware
        .layer(middleware::from_fn_with_state(state.clone(), auth_gate))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
