//! 领域模型模块
//!
//! 纯数据结构，不包含业务逻辑

pub mod deploy;
pub mod system;

pub use deploy::{DeployOutcome, DeployRequest, FileRecord, SpooledFile};
pub use system::ServerInfo;
