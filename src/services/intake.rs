//! 上传处理
//!
//! 解析目标部署目录并落盘上传文件：
//! - `init=true` 且带 ZIP：解压模板到部署目录
//! - `init=true` 且指定 `template`：从预置模板目录复制
//! - 否则：逐个保存上传文件，单个失败只记录日志并跳过

use std::io;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

use crate::config::env::constants::DEFAULT_EXPORT_TYPE;
use crate::config::EnvConfig;
use crate::domain::deploy::{DeployOutcome, DeployRequest, FileRecord, SpooledFile};
use crate::error::ApiError;
use crate::infra::path_guard;
use crate::infra::template::copy_directory;
use crate::infra::{ArchiveExtractor, ExtractionError, TemplateError};

/// 上传处理错误
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Invalid relative path")]
    InvalidRelativePath,
    #[error("Invalid export type")]
    InvalidExportType,
    #[error("No files sent")]
    NoFiles,
    #[error("Unknown site template: {0}")]
    UnknownTemplate(String),
    #[error("Error creating deployment directory: {0}")]
    CreateDir(#[source] io::Error),
    #[error("Error extracting ZIP file: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("Error copying site template: {0}")]
    TemplateCopy(#[from] TemplateError),
    #[error("Background task failed: {0}")]
    Task(String),
}

impl From<IntakeError> for ApiError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::InvalidRelativePath
            | IntakeError::InvalidExportType
            | IntakeError::NoFiles
            | IntakeError::UnknownTemplate(_) => ApiError::bad_request(err.to_string()),
            _ => ApiError::internal(err.to_string()),
        }
    }
}

/// 上传处理器
#[derive(Clone, Debug)]
pub struct UploadIntake {
    deployment_root: PathBuf,
    default_export_type: Option<String>,
    templates_dir: Option<PathBuf>,
}

impl UploadIntake {
    pub fn new(
        deployment_root: impl Into<PathBuf>,
        default_export_type: Option<String>,
        templates_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            deployment_root: deployment_root.into(),
            default_export_type,
            templates_dir,
        }
    }

    pub fn from_config(config: &EnvConfig) -> Self {
        Self::new(
            config.deployment_path.clone(),
            config.export_type.clone(),
            config.templates_dir.clone(),
        )
    }

    /// 请求值优先，其次是配置，最后回落到 `hugo`
    pub fn export_type_for(&self, requested: &str) -> String {
        let requested = requested.trim();
        if !requested.is_empty() {
            return requested.to_string();
        }
        self.default_export_type
            .clone()
            .unwrap_or_else(|| DEFAULT_EXPORT_TYPE.to_string())
    }

    /// 计算 `root/export_type/relative_path`，不访问文件系统
    pub fn resolve_target(
        &self,
        export_type: &str,
        relative_path: &str,
    ) -> Result<PathBuf, IntakeError> {
        if path_guard::has_traversal_segment(relative_path) {
            return Err(IntakeError::InvalidRelativePath);
        }
        if path_guard::base_name(export_type) != Some(export_type) {
            return Err(IntakeError::InvalidExportType);
        }

        let export_root = self.deployment_root.join(export_type);
        // 开头的分隔符按相对路径处理
        let trimmed = relative_path.trim_start_matches(['/', '\\']);
        path_guard::resolve(&export_root, trimmed).map_err(|e| {
            warn!(relative_path = %relative_path, error = %e, "Rejected relative path");
            IntakeError::InvalidRelativePath
        })
    }

    /// 处理一次部署请求
    pub async fn handle(&self, request: DeployRequest) -> Result<DeployOutcome, IntakeError> {
        let export_type = self.export_type_for(&request.export_type);
        let deploy_path = self.resolve_target(&export_type, &request.relative_path)?;
        let template_source = self.template_source(&request).await?;

        tokio::fs::create_dir_all(&deploy_path).await.map_err(|e| {
            error!(path = %deploy_path.display(), error = %e, "Error creating deployment directory");
            IntakeError::CreateDir(e)
        })?;

        if request.init {
            if let Some(archive) = &request.archive {
                return self
                    .initialize_from_archive(archive, &export_type, &deploy_path)
                    .await;
            }
            if let Some((name, source)) = template_source {
                return self
                    .initialize_from_template(name, source, &export_type, &deploy_path)
                    .await;
            }
            info!("No template ZIP file provided, processing uploaded files");
        }

        self.save_files(&request, &deploy_path).await
    }

    async fn initialize_from_archive(
        &self,
        archive: &SpooledFile,
        export_type: &str,
        deploy_path: &Path,
    ) -> Result<DeployOutcome, IntakeError> {
        info!(
            filename = %archive.filename,
            size = archive.size,
            "Received template ZIP file"
        );

        let archive_path = archive.path.to_path_buf();
        let dest = deploy_path.to_path_buf();
        let entries = tokio::task::spawn_blocking(move || {
            ArchiveExtractor::extract_file(&archive_path, &dest)
        })
        .await
        .map_err(|e| IntakeError::Task(e.to_string()))?
        .map_err(|e| {
            error!(error = %e, "Error extracting ZIP file");
            IntakeError::Extraction(e)
        })?;

        info!(
            path = %deploy_path.display(),
            entries,
            "Extracted template ZIP file"
        );
        Ok(DeployOutcome::Initialized {
            message: initialized_message(export_type, deploy_path),
        })
    }

    /// 需要从模板目录初始化时，在创建部署目录之前校验模板名
    ///
    /// 模板名必须是单个路径段，且对应 `templates_dir` 下已存在的目录
    async fn template_source<'a>(
        &self,
        request: &'a DeployRequest,
    ) -> Result<Option<(&'a str, PathBuf)>, IntakeError> {
        if !request.init || request.archive.is_some() {
            return Ok(None);
        }
        let (Some(name), Some(templates_dir)) =
            (request.template.as_deref(), self.templates_dir.as_ref())
        else {
            return Ok(None);
        };
        if name.is_empty() {
            return Ok(None);
        }
        if path_guard::base_name(name) != Some(name) {
            warn!(template = %name, "Rejected site template name");
            return Err(IntakeError::UnknownTemplate(name.to_string()));
        }

        let source = templates_dir.join(name);
        let is_dir = tokio::fs::metadata(&source)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(IntakeError::UnknownTemplate(name.to_string()));
        }
        Ok(Some((name, source)))
    }

    async fn initialize_from_template(
        &self,
        name: &str,
        source: PathBuf,
        export_type: &str,
        deploy_path: &Path,
    ) -> Result<DeployOutcome, IntakeError> {
        let dest = deploy_path.to_path_buf();
        let copied = tokio::task::spawn_blocking(move || copy_directory(&source, &dest))
            .await
            .map_err(|e| IntakeError::Task(e.to_string()))?
            .map_err(|e| {
                error!(template = %name, error = %e, "Error copying site template");
                IntakeError::TemplateCopy(e)
            })?;

        info!(
            template = %name,
            path = %deploy_path.display(),
            files = copied,
            "Copied site template"
        );
        Ok(DeployOutcome::Initialized {
            message: initialized_message(export_type, deploy_path),
        })
    }

    async fn save_files(
        &self,
        request: &DeployRequest,
        deploy_path: &Path,
    ) -> Result<DeployOutcome, IntakeError> {
        if request.files.is_empty() {
            return Err(IntakeError::NoFiles);
        }

        let relative = path_guard::normalized_relative(&request.relative_path);
        let mut saved = Vec::with_capacity(request.files.len());

        for upload in &request.files {
            let Some(filename) = path_guard::base_name(&upload.filename) else {
                warn!(filename = %upload.filename, "Skipping upload with unusable filename");
                continue;
            };
            let target = deploy_path.join(filename);

            match copy_upload(&upload.path, &target).await {
                Ok(size) => {
                    info!(path = %target.display(), size, "File saved successfully");
                    saved.push(FileRecord {
                        path: if relative.is_empty() {
                            filename.to_string()
                        } else {
                            format!("{}/{}", relative, filename)
                        },
                        content_type: upload.content_type.clone(),
                        size,
                    });
                }
                Err(e) => {
                    warn!(filename = %filename, target = %target.display(), error = %e, "Error saving uploaded file, skipping");
                }
            }
        }

        Ok(DeployOutcome::Saved {
            message: format!(
                "Successfully saved {} files to {}",
                saved.len(),
                deploy_path.display()
            ),
            files: saved,
        })
    }
}

fn initialized_message(export_type: &str, deploy_path: &Path) -> String {
    format!(
        "Successfully initialized {} site template at {}",
        export_type,
        deploy_path.display()
    )
}

/// 将缓存的上传内容复制到目标文件（存在则截断）
async fn copy_upload(source: &Path, target: &Path) -> io::Result<u64> {
    let mut src = tokio::fs::File::open(source).await?;
    let mut dst = tokio::fs::File::create(target).await?;
    let copied = tokio::io::copy(&mut src, &mut dst).await?;
    dst.flush().await?;
    Ok(copied)
}
