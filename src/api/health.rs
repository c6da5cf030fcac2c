//! 健康检查和服务信息 API
//!
//! 包含 /health, /info 端点

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::SecondsFormat;
use std::sync::Arc;

use crate::api::response::{respond, ApiResponse};
use crate::config::env::constants::VERSION;
use crate::domain::system::ServerInfo;
use crate::state::AppState;

/// 创建健康检查路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
}

/// 健康检查
///
/// GET /health
async fn health_check() -> Response {
    respond(StatusCode::OK, ApiResponse::success("Server is running properly"))
}

/// 服务信息
///
/// GET /info
async fn server_info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ServerInfo {
        deployment_path: state.config.deployment_path.display().to_string(),
        server_time: chrono::Local::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        version: VERSION,
    })
}
