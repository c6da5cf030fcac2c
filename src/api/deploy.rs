//! 部署上传 API
//!
//! POST /deploy，multipart 表单字段：
//! `export_type`、`relative_path`、`init`、`template`、`template_zip`（文件）、`files`（多个文件）

use axum::{
    extract::{
        multipart::{Field, MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    response::Response,
    routing::post,
    Router,
};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};

use crate::api::response::{respond, ApiResponse};
use crate::domain::deploy::{DeployOutcome, DeployRequest, SpooledFile};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// 创建部署路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/deploy", post(deploy).fallback(method_not_allowed))
}

/// 上传文件或初始化站点模板
///
/// POST /deploy
/// 需要 Bearer token
async fn deploy(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Response> {
    let multipart = multipart.map_err(|e| {
        warn!(error = %e, "Rejected non-multipart deploy request");
        ApiError::bad_request(format!("Error parsing multipart form: {}", e))
    })?;

    let request = read_deploy_request(multipart).await?;
    let outcome = state.intake.handle(request).await?;

    Ok(match outcome {
        DeployOutcome::Initialized { message } => {
            respond(StatusCode::OK, ApiResponse::success(message))
        }
        DeployOutcome::Saved { message, files } => {
            respond(StatusCode::OK, ApiResponse::success(message).with_files(files))
        }
    })
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// 读取整个 multipart 表单
///
/// 文件部分边读边写入临时文件，字段顺序不影响结果
pub async fn read_deploy_request(mut multipart: Multipart) -> ApiResult<DeployRequest> {
    let mut request = DeployRequest::default();

    while let Some(field) = multipart.next_field().await.map_err(parse_error)? {
        let name = field.name().unwrap_or_default().to_string();
        let is_file = field.file_name().is_some();

        match (name.as_str(), is_file) {
            ("export_type", false) => request.export_type = field.text().await.map_err(parse_error)?,
            ("relative_path", false) => {
                request.relative_path = field.text().await.map_err(parse_error)?
            }
            ("init", false) => request.init = field.text().await.map_err(parse_error)? == "true",
            ("template", false) => {
                let value = field.text().await.map_err(parse_error)?;
                request.template = Some(value).filter(|v| !v.is_empty());
            }
            ("template_zip", true) => request.archive = Some(spool(field).await?),
            ("files", true) => request.files.push(spool(field).await?),
            _ => debug!(field = %name, "Ignoring unexpected form field"),
        }
    }

    Ok(request)
}

/// 将文件部分写入临时文件
async fn spool(mut field: Field<'_>) -> ApiResult<SpooledFile> {
    let filename = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().unwrap_or_default().to_string();

    // 创建临时文件会阻塞，放到 blocking 线程池
    let (file, path) = tokio::task::spawn_blocking(NamedTempFile::new)
        .await
        .map_err(|e| {
            error!(error = %e, "Temporary file task failed");
            ApiError::internal(format!("Error creating temporary file: {}", e))
        })?
        .map_err(temp_error)?
        .into_parts();
    let mut out = tokio::fs::File::from_std(file);
    let mut size = 0u64;

    while let Some(chunk) = field.chunk().await.map_err(parse_error)? {
        out.write_all(&chunk).await.map_err(temp_error)?;
        size += chunk.len() as u64;
    }
    out.flush().await.map_err(temp_error)?;

    debug!(filename = %filename, size, "Spooled upload to temporary storage");
    Ok(SpooledFile {
        filename,
        content_type,
        size,
        path,
    })
}

fn parse_error(e: MultipartError) -> ApiError {
    warn!(error = %e, "Error parsing multipart form");
    ApiError::bad_request(format!("Error parsing multipart form: {}", e))
}

fn temp_error(e: std::io::Error) -> ApiError {
    error!(error = %e, "Error writing temporary file");
    ApiError::internal(format!("Error creating temporary file: {}", e))
}
