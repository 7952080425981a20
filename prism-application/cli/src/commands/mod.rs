//! CLI 命令处理模块

pub mod common; // 公共工具函数
pub mod db;
pub mod endpoint;
pub mod refresh;
pub mod vm;
