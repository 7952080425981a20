//! 虚拟机操作错误定义

use thiserror::Error;

use prism_platform::PlatformError;

/// 虚拟机操作错误类型
#[derive(Error, Debug)]
pub enum OpsError {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// 电源状态不满足操作前置条件
    #[error("操作 {op} 不适用于当前电源状态 {state}")]
    InvalidPowerState { op: &'static str, state: String },

    /// 平台永久不支持的操作
    #[error("操作不支持: {0}")]
    Unsupported(&'static str),

    #[error("校验错误: {0}")]
    Validation(String),

    /// 客机级长任务失败
    #[error("任务失败: {0}")]
    TaskFailed(String),

    /// 客机级长任务超时
    #[error("等待任务 {task} 超时 ({timeout_secs} 秒)")]
    TaskTimeout { task: String, timeout_secs: u64 },
}

/// 虚拟机操作结果类型
pub type Result<T> = std::result::Result<T, OpsError>;
