//! 中间件模块

pub mod auth;

pub use auth::{admit, auth_gate, Admission};
