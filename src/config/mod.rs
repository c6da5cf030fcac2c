//! 配置模块
//!
//! 配置文件与环境变量解析

pub mod env;

pub use env::{EnvConfig, FileConfig};
