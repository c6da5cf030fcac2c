//! 预置站点模板目录复制
//!
//! `init=true` 但未上传 ZIP 时，可以按名称从模板目录复制一份现成站点骨架

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// 模板复制错误
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),
    #[error("failed to copy {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// 递归复制目录树，保留文件权限，返回复制的文件数
pub fn copy_directory(src: &Path, dst: &Path) -> Result<usize, TemplateError> {
    let io_err = |path: &Path, source: io::Error| TemplateError::Io {
        path: path.to_path_buf(),
        source,
    };

    if !src.is_dir() {
        return Err(TemplateError::NotADirectory(src.to_path_buf()));
    }

    let mut copied = 0;
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            TemplateError::Io {
                path,
                source: e.into(),
            }
        })?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| io_err(entry.path(), io::Error::new(io::ErrorKind::Other, e)))?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| io_err(&target, e))?;
            let metadata = entry
                .metadata()
                .map_err(|e| io_err(entry.path(), e.into()))?;
            fs::set_permissions(&target, metadata.permissions())
                .map_err(|e| io_err(&target, e))?;
        } else if entry.file_type().is_file() {
            // fs::copy 同时复制权限位
            fs::copy(entry.path(), &target).map_err(|e| io_err(&target, e))?;
            copied += 1;
        }
    }

    Ok(copied)
}
