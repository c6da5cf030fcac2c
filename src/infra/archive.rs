//! ZIP 模板解压
//!
//! 按中央目录中的存储顺序逐条解压，每个条目都要先通过路径校验。
//! 遇到第一个错误立即中止；已写入的条目保留在磁盘上，不做回滚。

use std::fs::{self, File, OpenOptions};
use std::io::{self, Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zip::result::ZipError;

use super::path_guard;

/// 归档条目未携带权限位时的默认目录权限
const DEFAULT_DIR_MODE: u32 = 0o755;
/// 归档条目未携带权限位时的默认文件权限
const DEFAULT_FILE_MODE: u32 = 0o644;

/// 解压错误
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// 不是合法的 ZIP 容器，或条目头损坏
    #[error("malformed archive: {0}")]
    Malformed(String),
    /// 条目路径越出目标目录
    #[error("illegal file path: {0}")]
    UnsafePath(String),
    /// 文件系统错误
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ExtractionError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// ZIP 解压器
pub struct ArchiveExtractor;

impl ArchiveExtractor {
    /// 解压归档到 `dest`，返回写入的条目数（目录 + 文件）
    pub fn extract<R: Read + Seek>(reader: R, dest: &Path) -> Result<usize, ExtractionError> {
        let mut archive =
            zip::ZipArchive::new(reader).map_err(|e| ExtractionError::Malformed(e.to_string()))?;

        create_dir(dest, DEFAULT_DIR_MODE)?;

        let mut written = 0;
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index).map_err(|e| match e {
                ZipError::Io(source) => ExtractionError::io(dest, source),
                other => ExtractionError::Malformed(other.to_string()),
            })?;

            let name = entry.name().to_string();
            let target = path_guard::resolve(dest, &name).map_err(|e| {
                warn!(entry = %name, error = %e, "Rejected archive entry");
                ExtractionError::UnsafePath(name.clone())
            })?;
            let mode = entry.unix_mode().map(|m| m & 0o777);

            if entry.is_dir() {
                create_dir(&target, mode.unwrap_or(DEFAULT_DIR_MODE))?;
            } else {
                if let Some(parent) = target.parent() {
                    create_dir(parent, DEFAULT_DIR_MODE)?;
                }
                let mut out = create_file(&target, mode.unwrap_or(DEFAULT_FILE_MODE))?;
                io::copy(&mut entry, &mut out).map_err(|e| ExtractionError::io(&target, e))?;
            }

            debug!(entry = %name, size = entry.size(), "Extracted archive entry");
            written += 1;
        }

        Ok(written)
    }

    /// 从内存中的字节解压
    pub fn extract_bytes(bytes: &[u8], dest: &Path) -> Result<usize, ExtractionError> {
        Self::extract(Cursor::new(bytes), dest)
    }

    /// 从磁盘上的归档文件解压
    pub fn extract_file(archive: &Path, dest: &Path) -> Result<usize, ExtractionError> {
        let file = File::open(archive).map_err(|e| ExtractionError::io(archive, e))?;
        Self::extract(file, dest)
    }
}

#[cfg(unix)]
fn create_dir(path: &Path, mode: u32) -> Result<(), ExtractionError> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new()
        .recursive(true)
        .mode(mode)
        .create(path)
        .map_err(|e| ExtractionError::io(path, e))
}

#[cfg(not(unix))]
fn create_dir(path: &Path, _mode: u32) -> Result<(), ExtractionError> {
    fs::create_dir_all(path).map_err(|e| ExtractionError::io(path, e))
}

#[cfg(unix)]
fn create_file(path: &Path, mode: u32) -> Result<File, ExtractionError> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(path)
        .map_err(|e| ExtractionError::io(path, e))
}

#[cfg(not(unix))]
fn create_file(path: &Path, _mode: u32) -> Result<File, ExtractionError> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| ExtractionError::io(path, e))
}
