//! 业务服务模块
//!
//! 上传处理与模板初始化

pub mod intake;

pub use intake::{IntakeError, UploadIntake};
