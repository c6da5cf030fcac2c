//! 路径安全校验
//!
//! 对调用方提供的相对路径做纯词法分析（不访问文件系统），
//! 保证拼接后的结果不会逃出给定根目录。`/` 与 `\` 都视为分隔符。

use std::path::{Component, Path, PathBuf};

/// 路径校验错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// 绝对路径或带盘符的路径
    #[error("absolute path not allowed: {0}")]
    Absolute(String),
    /// `..` 越过了根目录
    #[error("path escapes its root: {0}")]
    Traversal(String),
}

/// 将 `candidate` 拼接到 `root` 下并做词法规范化
///
/// 结果总是等于 `root` 或位于 `root` 之内，否则返回错误。
/// `root` 应当已经是绝对、规范化的路径。
pub fn resolve(root: &Path, candidate: &str) -> Result<PathBuf, PathError> {
    if is_absolute_like(candidate) {
        return Err(PathError::Absolute(candidate.to_string()));
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in split_segments(candidate) {
        match segment {
            "" | "." => continue,
            ".." => {
                if segments.pop().is_none() {
                    return Err(PathError::Traversal(candidate.to_string()));
                }
            }
            s => {
                // Windows 下 `C:x` 这类片段会替换整个路径前缀
                let rooted = Path::new(s)
                    .components()
                    .any(|c| matches!(c, Component::Prefix(_) | Component::RootDir));
                if rooted {
                    return Err(PathError::Absolute(candidate.to_string()));
                }
                segments.push(s);
            }
        }
    }

    let mut resolved = root.to_path_buf();
    resolved.extend(segments);
    Ok(resolved)
}

/// 是否包含 `..` 片段
pub fn has_traversal_segment(candidate: &str) -> bool {
    split_segments(candidate).any(|s| s == "..")
}

/// 去掉目录部分，只保留文件名
///
/// 结果为空、`.` 或 `..` 时返回 `None`
pub fn base_name(name: &str) -> Option<&str> {
    match split_segments(name).last() {
        None | Some("") | Some(".") | Some("..") => None,
        Some(s) => Some(s),
    }
}

/// 规范化后的相对路径（`/` 分隔，去掉 `.` 和空片段）
///
/// 仅用于展示与清单路径，调用前应已通过 [`resolve`] 校验
pub fn normalized_relative(candidate: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in split_segments(candidate) {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

fn split_segments(candidate: &str) -> impl Iterator<Item = &str> {
    candidate.split(['/', '\\'])
}

fn is_absolute_like(candidate: &str) -> bool {
    if candidate.starts_with('/') || candidate.starts_with('\\') {
        return true;
    }
    let bytes = candidate.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
