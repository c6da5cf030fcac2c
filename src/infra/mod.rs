//! 基础设施层
//!
//! 路径校验、归档解压、模板复制

pub mod archive;
pub mod path_guard;
pub mod template;

pub use archive::{ArchiveExtractor, ExtractionError};
pub use path_guard::PathError;
pub use template::TemplateError;
